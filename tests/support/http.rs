//! Scripted HTTP transport keyed by URL fragment.

use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::Mutex;

use betascope_core::{HttpClient, HttpError, HttpRequest, HttpResponse};

struct Route {
    fragment: String,
    replies: VecDeque<Result<HttpResponse, HttpError>>,
}

/// Answers each request from the first route whose fragment appears in the
/// URL. A route replays its replies in order and repeats the last one.
/// Unrouted URLs get a 404.
#[derive(Default)]
pub struct ScriptedHttpClient {
    routes: Mutex<Vec<Route>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl ScriptedHttpClient {
    /// Client with a working Yahoo session handshake (crumb `crumb123`).
    pub fn with_session() -> Self {
        Self::default()
            .route("fc.yahoo.com", HttpResponse::new(404, ""))
            .route("getcrumb", HttpResponse::ok("crumb123"))
    }

    pub fn route(self, fragment: &str, reply: HttpResponse) -> Self {
        self.route_sequence(fragment, vec![Ok(reply)])
    }

    pub fn route_sequence(self, fragment: &str, replies: Vec<Result<HttpResponse, HttpError>>) -> Self {
        self.routes.lock().expect("routes lock").push(Route {
            fragment: fragment.to_owned(),
            replies: replies.into(),
        });
        self
    }

    pub fn urls(&self) -> Vec<String> {
        self.requests
            .lock()
            .expect("requests lock")
            .iter()
            .map(|request| request.url.clone())
            .collect()
    }

    pub fn urls_containing(&self, fragment: &str) -> Vec<String> {
        self.urls()
            .into_iter()
            .filter(|url| url.contains(fragment))
            .collect()
    }

    fn reply(&self, url: &str) -> Result<HttpResponse, HttpError> {
        let mut routes = self.routes.lock().expect("routes lock");
        let Some(route) = routes.iter_mut().find(|route| url.contains(&route.fragment)) else {
            return Ok(HttpResponse::new(404, "not routed"));
        };
        if route.replies.len() > 1 {
            route.replies.pop_front().expect("checked length")
        } else {
            route
                .replies
                .front()
                .cloned()
                .unwrap_or_else(|| Ok(HttpResponse::new(404, "no replies")))
        }
    }
}

impl HttpClient for ScriptedHttpClient {
    fn get<'a>(
        &'a self,
        request: HttpRequest,
    ) -> Pin<Box<dyn Future<Output = Result<HttpResponse, HttpError>> + Send + 'a>> {
        let reply = self.reply(&request.url);
        self.requests.lock().expect("requests lock").push(request);
        Box::pin(async move { reply })
    }
}
