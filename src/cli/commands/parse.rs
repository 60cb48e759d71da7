//! Parse command implementation.

use crate::core::dates::DateParser;
use crate::core::pattern::SeasonEpisodeParser;
use crate::Result;
use colored::Colorize;

/// Parse season/episode numbers and air dates from the given names.
pub fn parse(names: &[String], strict: bool) -> Result<()> {
    let parser = if strict {
        SeasonEpisodeParser::strict()
    } else {
        SeasonEpisodeParser::default()
    };
    let dates = DateParser::default();

    for name in names {
        let numbers = parser.parse(name);
        let date = dates.parse(name);

        print!("{}", name.bold());
        if numbers.is_empty() && date.is_none() {
            println!("  {}", "no match".red());
            continue;
        }
        println!();
        for sxe in &numbers {
            println!("  {}", sxe.to_string().green());
        }
        if let Some(date) = date {
            println!("  {}", date.format("%Y-%m-%d").to_string().cyan());
        }
    }

    Ok(())
}
