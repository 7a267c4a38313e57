//! Registered HTTP status codes and the error names derived from them.
//!
//! The table maps every registered status code to its canonical
//! SCREAMING_SNAKE symbol (e.g. `404 => NOT_FOUND`) and to the error name
//! used on the wire (e.g. `NotFoundError`). It is built once on first use and
//! never mutated afterwards.

use std::collections::HashMap;
use std::sync::LazyLock;

use heck::ToUpperCamelCase;

/// The error name used for status codes that are not registered client or
/// server errors.
pub const GENERIC_ERROR_NAME: &str = "HttpError";

const ERROR_SUFFIX: &str = "Error";

macro_rules! registered_statuses {
    ($($code:literal => $symbol:ident,)*) => {
        const REGISTERED: &[(u16, &str)] = &[$(($code, stringify!($symbol)),)*];
    };
}

registered_statuses! {
    100 => CONTINUE,
    101 => SWITCHING_PROTOCOLS,
    102 => PROCESSING,
    103 => EARLY_HINTS,
    200 => OK,
    201 => CREATED,
    202 => ACCEPTED,
    203 => NON_AUTHORITATIVE_INFORMATION,
    204 => NO_CONTENT,
    205 => RESET_CONTENT,
    206 => PARTIAL_CONTENT,
    207 => MULTI_STATUS,
    300 => MULTIPLE_CHOICES,
    301 => MOVED_PERMANENTLY,
    302 => MOVED_TEMPORARILY,
    303 => SEE_OTHER,
    304 => NOT_MODIFIED,
    305 => USE_PROXY,
    307 => TEMPORARY_REDIRECT,
    308 => PERMANENT_REDIRECT,
    400 => BAD_REQUEST,
    401 => UNAUTHORIZED,
    402 => PAYMENT_REQUIRED,
    403 => FORBIDDEN,
    404 => NOT_FOUND,
    405 => METHOD_NOT_ALLOWED,
    406 => NOT_ACCEPTABLE,
    407 => PROXY_AUTHENTICATION_REQUIRED,
    408 => REQUEST_TIMEOUT,
    409 => CONFLICT,
    410 => GONE,
    411 => LENGTH_REQUIRED,
    412 => PRECONDITION_FAILED,
    413 => REQUEST_TOO_LONG,
    414 => REQUEST_URI_TOO_LONG,
    415 => UNSUPPORTED_MEDIA_TYPE,
    416 => REQUESTED_RANGE_NOT_SATISFIABLE,
    417 => EXPECTATION_FAILED,
    418 => IM_A_TEAPOT,
    419 => INSUFFICIENT_SPACE_ON_RESOURCE,
    420 => METHOD_FAILURE,
    421 => MISDIRECTED_REQUEST,
    422 => UNPROCESSABLE_ENTITY,
    423 => LOCKED,
    424 => FAILED_DEPENDENCY,
    426 => UPGRADE_REQUIRED,
    428 => PRECONDITION_REQUIRED,
    429 => TOO_MANY_REQUESTS,
    431 => REQUEST_HEADER_FIELDS_TOO_LARGE,
    451 => UNAVAILABLE_FOR_LEGAL_REASONS,
    500 => INTERNAL_SERVER_ERROR,
    501 => NOT_IMPLEMENTED,
    502 => BAD_GATEWAY,
    503 => SERVICE_UNAVAILABLE,
    504 => GATEWAY_TIMEOUT,
    505 => HTTP_VERSION_NOT_SUPPORTED,
    507 => INSUFFICIENT_STORAGE,
    511 => NETWORK_AUTHENTICATION_REQUIRED,
}

static TABLE: LazyLock<HashMap<u16, NamedStatus>> = LazyLock::new(|| {
    REGISTERED
        .iter()
        .map(|&(code, symbol)| (code, NamedStatus::new(code, symbol)))
        .collect()
});

/// An entry of the registered status table.
///
/// # Examples
///
/// ```
/// use handwrap_core::status;
///
/// let status = status::lookup(404).unwrap();
/// assert_eq!(status.symbol(), "NOT_FOUND");
/// assert_eq!(status.error_name(), "NotFoundError");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedStatus {
    code: u16,
    symbol: &'static str,
    error_name: String,
}

impl NamedStatus {
    fn new(code: u16, symbol: &'static str) -> Self {
        Self {
            code,
            symbol,
            error_name: error_name_from_symbol(symbol),
        }
    }

    /// Returns the numeric status code.
    #[must_use]
    pub fn code(&self) -> u16 {
        self.code
    }

    /// Returns the canonical symbol, e.g. `NOT_FOUND`.
    #[must_use]
    pub fn symbol(&self) -> &'static str {
        self.symbol
    }

    /// Returns the PascalCase error name, e.g. `NotFoundError`.
    #[must_use]
    pub fn error_name(&self) -> &str {
        &self.error_name
    }
}

/// Looks up a status code in the registered table.
#[must_use]
pub fn lookup(code: u16) -> Option<&'static NamedStatus> {
    TABLE.get(&code)
}

/// Returns the canonical symbol for a registered status code.
///
/// # Examples
///
/// ```
/// use handwrap_core::status::symbol_for_status;
///
/// assert_eq!(symbol_for_status(418), Some("IM_A_TEAPOT"));
/// assert_eq!(symbol_for_status(499), None);
/// ```
#[must_use]
pub fn symbol_for_status(code: u16) -> Option<&'static str> {
    lookup(code).map(NamedStatus::symbol)
}

/// Returns the error name for a status code.
///
/// Registered codes in the `400..=511` range map to their PascalCase symbol
/// with an `Error` suffix. Everything else, including registered
/// informational, success and redirection codes, maps to
/// [`GENERIC_ERROR_NAME`].
///
/// # Examples
///
/// ```
/// use handwrap_core::status::name_for_status;
///
/// assert_eq!(name_for_status(404), "NotFoundError");
/// assert_eq!(name_for_status(500), "InternalServerError");
/// assert_eq!(name_for_status(200), "HttpError");
/// assert_eq!(name_for_status(499), "HttpError");
/// ```
#[must_use]
pub fn name_for_status(code: u16) -> &'static str {
    if !(400..=511).contains(&code) {
        return GENERIC_ERROR_NAME;
    }

    lookup(code).map_or(GENERIC_ERROR_NAME, NamedStatus::error_name)
}

fn error_name_from_symbol(symbol: &str) -> String {
    let mut name = symbol.to_upper_camel_case();
    if !name.ends_with(ERROR_SUFFIX) {
        name.push_str(ERROR_SUFFIX);
    }
    name
}
