/// Authenticated caller, derived from a validated session token.
///
/// Lives in the request extensions for the duration of one request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Principal {
    pub email: String,
}
