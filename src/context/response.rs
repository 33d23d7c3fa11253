use http::{HeaderMap, StatusCode};
use std::mem;
use tracing::warn;

/// Buffered response writer.
///
/// The response is *committed* by the first [`write_header`](Self::write_header)
/// or [`write`](Self::write). After that the status line is fixed: a second
/// `write_header` is ignored with a warning, and the error handler will not
/// touch the response.
#[derive(Debug)]
pub struct Response {
    status: StatusCode,
    headers: HeaderMap,
    body: Vec<u8>,
    committed: bool,
}

impl Default for Response {
    fn default() -> Self {
        Self::new()
    }
}

impl Response {
    #[must_use]
    pub fn new() -> Self {
        Self {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            body: Vec::new(),
            committed: false,
        }
    }

    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Headers may be changed until the response is turned into an
    /// `http::Response`; there is no wire to flush them to earlier.
    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    #[must_use]
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Number of body bytes written so far
    #[must_use]
    pub fn size(&self) -> usize {
        self.body.len()
    }

    #[must_use]
    pub fn is_committed(&self) -> bool {
        self.committed
    }

    /// Set the status and commit the response
    pub fn write_header(&mut self, status: StatusCode) {
        if self.committed {
            warn!(
                current = self.status.as_u16(),
                attempted = status.as_u16(),
                "Response already committed, ignoring status change"
            );
            return;
        }
        self.status = status;
        self.committed = true;
    }

    /// Append to the body, committing with `200 OK` if nothing was committed yet
    pub fn write(&mut self, bytes: &[u8]) {
        if !self.committed {
            self.write_header(StatusCode::OK);
        }
        self.body.extend_from_slice(bytes);
    }

    /// Move the buffered response out, leaving this one reset
    pub fn take_http(&mut self) -> http::Response<Vec<u8>> {
        let mut res = http::Response::new(mem::take(&mut self.body));
        *res.status_mut() = self.status;
        *res.headers_mut() = mem::take(&mut self.headers);
        self.reset();
        res
    }

    /// Forget everything written so far
    pub fn reset(&mut self) {
        self.status = StatusCode::OK;
        self.headers.clear();
        self.body.clear();
        self.committed = false;
    }
}
