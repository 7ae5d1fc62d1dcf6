pub mod correlation;
pub mod negotiate;

pub use correlation::{ConnectionToken, CorrelationEntry, CorrelationMap};
pub use negotiate::NegotiateBody;
