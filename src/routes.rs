// Routes - access control for the client's entry points
//
// Mirrors the edge-layer check of the web deployment: unauthenticated
// visitors are sent to login (remembering where they were going), signed-in
// users are bounced off the auth pages. The CLI runs the same check before
// opening the chat view.

use tokio::sync::mpsc;

pub const LOGIN_PATH: &str = "/login";
pub const REGISTER_PATH: &str = "/register";
pub const FORGOT_PASSWORD_PATH: &str = "/forgot-password";
pub const HOME_PATH: &str = "/";

const PUBLIC_ROUTES: [&str; 3] = [LOGIN_PATH, REGISTER_PATH, FORGOT_PASSWORD_PATH];

/// Prefixes that are never access-checked
const PASSTHROUGH_PREFIXES: [&str; 4] = ["/_next", "/api", "/public", "/favicon.ico"];

/// Something that can move the user to another entry point
pub trait Navigator: Send + Sync {
    fn navigate(&self, path: &str);
}

/// Navigator that forwards requested paths to the running front-end
pub struct ChannelNavigator {
    tx: mpsc::UnboundedSender<String>,
}

impl ChannelNavigator {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl Navigator for ChannelNavigator {
    fn navigate(&self, path: &str) {
        tracing::debug!("Navigate to {}", path);
        // Receiver gone means the front-end already exited
        let _ = self.tx.send(path.to_string());
    }
}

/// Outcome of the access check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteDecision {
    Allow,
    Redirect(String),
}

pub fn is_public(path: &str) -> bool {
    PUBLIC_ROUTES
        .iter()
        .any(|r| path == *r || path.starts_with(&format!("{}/", r)))
}

/// Decide whether `path` may be shown given whether a token is present
pub fn guard(path: &str, has_token: bool) -> RouteDecision {
    if PASSTHROUGH_PREFIXES.iter().any(|p| path.starts_with(p)) {
        return RouteDecision::Allow;
    }

    let public = is_public(path);
    if !has_token && !public {
        return RouteDecision::Redirect(format!(
            "{}?from={}",
            LOGIN_PATH,
            urlencoding::encode(path)
        ));
    }
    if has_token && public {
        return RouteDecision::Redirect(HOME_PATH.to_string());
    }
    RouteDecision::Allow
}
