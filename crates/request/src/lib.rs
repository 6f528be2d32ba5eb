//! Card requests over PC/SC readers
//!
//! A [`CardRequest`] blocks until a card matching a [`CardType`] sits in one
//! of the watched readers, or until cards are inserted, within an overall
//! [`Timeout`]. Readers are polled in short status change waits so readers
//! that are plugged in or removed while waiting are picked up.
//!
//! # Features
//!
//! - `pcsc` (default): [`PcscSubsystem`], backed by the platform PC/SC service
//!
//! # Examples
//!
//! ```no_run
//! # #[cfg(feature = "pcsc")]
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use nexum_card_request::{CardRequest, PcscSubsystem, RequestConfig, Timeout};
//!
//! let config = RequestConfig::new()
//!     .with_new_card_only(true)
//!     .with_timeout(Timeout::from_secs(10));
//! let request = CardRequest::new(PcscSubsystem::shared()?, config);
//!
//! println!("Insert a new card within 10 seconds");
//! let service = request.wait_for_card()?;
//! println!("Card in {}", service.connection().reader_name());
//! # Ok(())
//! # }
//! # #[cfg(not(feature = "pcsc"))]
//! # fn main() {}
//! ```
#![cfg_attr(not(test), warn(unused_crate_dependencies))]

mod card;
mod card_type;
mod config;
mod deadline;
mod error;
mod flags;
mod matcher;
mod reader;
mod request;
mod service;
mod state;
mod subsystem;
mod util;
mod waiter;

pub use card::Card;
pub use card_type::{AnyCardType, AtrCardType, AtrPatternError, CardType};
pub use config::{
    ConnectConfig, DEFAULT_POLLING_INTERVAL, DEFAULT_SERVICE_KIND, DEFAULT_TIMEOUT,
    RequestConfig, ShareMode, Timeout,
};
pub use deadline::DeadlineTimer;
pub use error::{RequestError, SubsystemError};
pub use flags::ReaderFlags;
pub use matcher::MatchEngine;
pub use reader::ReaderEnumerator;
pub use request::CardRequest;
pub use service::{CardServiceFactory, PassThruCardService, PassThruCardServiceFactory};
pub use state::{ReaderState, ReaderStateTable};
pub use subsystem::{ReaderSubsystem, StatusWatch};
pub use util::to_hex_string;
pub use waiter::{StatusWaiter, WaitOutcome};

#[cfg(feature = "pcsc")]
pub use pcsc::Protocols;
#[cfg(feature = "pcsc")]
pub use subsystem::{PcscConnection, PcscStatusWatch, PcscSubsystem};
