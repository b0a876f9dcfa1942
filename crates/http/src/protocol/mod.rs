//! Protocol types shared by the parser, the serializer and the connection driver.
//!
//! - [`Message`], [`PayloadItem`], [`PayloadSize`]: the event stream produced by the
//!   request parser
//! - [`RequestHeader`], [`RequestState`]: the parsed request head and where the request
//!   stands in its lifecycle
//! - [`ResponseHead`]: the response head handed to the serializer
//! - [`HttpError`], [`ParseError`], [`SendError`]: wire-level failures

mod message;
pub use message::Message;
pub use message::PayloadItem;
pub use message::PayloadSize;

mod request;
pub use request::RequestHeader;
pub use request::RequestState;

mod response;
pub use response::ResponseHead;

mod error;
pub use error::HttpError;
pub use error::ParseError;
pub use error::SendError;
