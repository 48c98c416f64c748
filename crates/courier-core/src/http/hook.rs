//! Pre-send hook
//!
//! The hook sees the fully assembled request (body, headers, cookies, auth)
//! and may mutate it further or reject it. A rejection aborts the call before
//! anything is sent and is surfaced as [`Error::Hook`] with the hook's own
//! error inside.

use reqwest::Request;

use crate::{Error, Result};

/// Last step before a request is handed to the client
pub trait BeforeRequest: Send + Sync {
    fn before_request(&self, request: &mut Request) -> anyhow::Result<()>;
}

impl<F> BeforeRequest for F
where
    F: Fn(&mut Request) -> anyhow::Result<()> + Send + Sync,
{
    fn before_request(&self, request: &mut Request) -> anyhow::Result<()> {
        self(request)
    }
}

pub(crate) fn run_hook(hook: Option<&dyn BeforeRequest>, request: &mut Request) -> Result<()> {
    match hook {
        Some(hook) => hook.before_request(request).map_err(Error::Hook),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;
    use reqwest::Method;

    fn request() -> Request {
        Request::new(Method::GET, "http://example.com/".parse().unwrap())
    }

    #[test]
    fn test_hook_can_mutate() {
        let hook = |req: &mut Request| -> anyhow::Result<()> {
            req.headers_mut()
                .insert("x-signature", HeaderValue::from_static("abc"));
            Ok(())
        };

        let mut req = request();
        run_hook(Some(&hook), &mut req).unwrap();
        assert_eq!(req.headers()["x-signature"], "abc");
    }

    #[test]
    fn test_hook_rejection_is_kept_intact() {
        #[derive(Debug, thiserror::Error)]
        #[error("quota exhausted")]
        struct QuotaExhausted;

        let hook = |_: &mut Request| -> anyhow::Result<()> { Err(anyhow::Error::new(QuotaExhausted)) };
        let err = run_hook(Some(&hook), &mut request()).unwrap_err();

        match err {
            Error::Hook(inner) => assert!(inner.downcast_ref::<QuotaExhausted>().is_some()),
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_no_hook() {
        assert!(run_hook(None, &mut request()).is_ok());
    }
}
