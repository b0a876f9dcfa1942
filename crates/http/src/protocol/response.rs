//! Response head type used by the serializer.

use http::Response;

/// The status line and header block of a response, before the body is attached.
pub type ResponseHead = Response<()>;
