use crate::cli::BandsArgs;
use crate::exit_codes;
use crate::output;
use eegpower_rs::FrequencyBand;

pub fn execute(args: BandsArgs) -> i32 {
    let bands = FrequencyBand::standard();

    if args.json {
        return output::print_json(&bands);
    }

    println!("Frequency bands:\n");
    println!("  {:<12} {:<12} {:<10}", "Name", "Display", "Range (Hz)");
    println!("  {}", "-".repeat(36));
    for band in &bands {
        println!(
            "  {:<12} {:<12} {:<10}",
            band.name,
            band.display_name(),
            band.range_label()
        );
    }
    println!();
    println!("Custom ranges: --band 15-25");

    exit_codes::SUCCESS
}
