pub mod dates;
pub mod money;
pub mod pii;

pub use dates::{parse_date, DateParseError};
pub use money::round_currency;
pub use pii::Masked;
