use std::convert::Infallible;
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use http_body::{Frame, SizeHint};

/// A fully buffered request or response body.
///
/// # Examples
///
/// ```
/// use handwrap_core::Body;
///
/// let body = Body::fixed("Hello, world!");
/// assert_eq!(body.as_bytes(), b"Hello, world!");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Body {
    data: Bytes,
}

impl Body {
    /// Create a new empty body.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Create a new body from a fixed buffer.
    #[must_use]
    pub fn fixed<T: Into<Bytes>>(data: T) -> Self {
        Self { data: data.into() }
    }

    /// Returns the body contents.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Consumes the body and returns its contents.
    #[must_use]
    pub fn into_bytes(self) -> Bytes {
        self.data
    }

    /// Returns `true` if the body has no contents.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns the number of bytes in the body.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }
}

impl http_body::Body for Body {
    type Data = Bytes;
    type Error = Infallible;

    fn poll_frame(
        mut self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        let data = std::mem::take(&mut self.data);
        if data.is_empty() {
            Poll::Ready(None)
        } else {
            Poll::Ready(Some(Ok(Frame::data(data))))
        }
    }

    fn is_end_stream(&self) -> bool {
        self.data.is_empty()
    }

    fn size_hint(&self) -> SizeHint {
        SizeHint::with_exact(self.data.len() as u64)
    }
}

macro_rules! body_from_impl {
    ($ty:ty) => {
        impl From<$ty> for Body {
            fn from(data: $ty) -> Self {
                Self::fixed(data)
            }
        }
    };
}

body_from_impl!(&'static [u8]);
body_from_impl!(Vec<u8>);
body_from_impl!(&'static str);
body_from_impl!(String);
body_from_impl!(Bytes);
