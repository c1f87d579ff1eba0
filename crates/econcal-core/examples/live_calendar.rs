use econcal_core::{CalendarScraper, ExtractionStatus};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut args = std::env::args().skip(1);
    let start = args.next();
    let end = args.next();

    let scraper = CalendarScraper::new()?;

    println!("Fetching calendar {:?} .. {:?}\n", start, end);

    let extraction = scraper.events(start.as_deref(), end.as_deref()).await?;

    match extraction.status() {
        ExtractionStatus::Empty => println!("No events in range."),
        ExtractionStatus::Populated => {
            for event in &extraction.records {
                println!(
                    "{:<22} {:<4} {:<40} {:<7} actual={:<8} prev={:<8} est={:<8} {}",
                    event.date,
                    event.country,
                    event.event,
                    event.impact.as_deref().unwrap_or("-"),
                    event.actual,
                    event.previous,
                    event.estimate,
                    event.currency,
                );
            }
        }
    }

    println!(
        "\n{} records from {} rows, {} skipped",
        extraction.records.len(),
        extraction.candidate_rows,
        extraction.diagnostics.len()
    );

    Ok(())
}
