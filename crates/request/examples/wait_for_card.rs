//! Example waiting for a newly inserted card

use nexum_card_request::{
    CardRequest, PcscSubsystem, RequestConfig, RequestError, Timeout, to_hex_string,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = RequestConfig::new()
        .with_new_card_only(true)
        .with_timeout(Timeout::from_secs(10));
    let request = CardRequest::new(PcscSubsystem::shared()?, config);

    println!("Insert a new card within 10 seconds");
    match request.wait_for_card() {
        Ok(service) => {
            let connection = service.connection();
            println!("Card inserted in {}", connection.reader_name());
            println!("ATR: {}", to_hex_string(&connection.atr()?));
        }
        Err(RequestError::Timeout) => println!("Time-out: no card inserted"),
        Err(e) => return Err(e.into()),
    }

    Ok(())
}
