pub mod entities;
pub mod errors;
pub mod events;
pub mod order_identifier;
pub mod signing;
pub mod value_objects;

pub use entities::{PaymentInfo, PaymentRecord, PaymentSession, RedirectForm, RefundRecord};
pub use errors::{DomainError, DomainResult};
pub use events::*;
pub use order_identifier::CompositeOrderId;
pub use signing::{KeyedHashSigner, Md5Keys};
pub use value_objects::{
    CardType, Decorator, DibsStatus, Money, PaymentState, RefundResultCode, RefundState,
};
