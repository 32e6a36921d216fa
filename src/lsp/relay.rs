//! The completion relay.
//!
//! Translates an editor completion request (document URI, cursor position)
//! into a canonical document locator string plus line/column, hands it to a
//! [`CompletionBackend`], and adapts the outcome into a completion list. The
//! relay is stateless and re-entrant; overlapping requests are independent
//! and unordered.
//!
//! Failures never escape: any backend error is logged and mapped to an
//! empty, non-incomplete list, so the editor sees "no completions" rather
//! than a failed request.

use std::borrow::Cow;
use std::future::Future;

use percent_encoding::percent_decode_str;
use tower_lsp_server::ls_types::{CompletionItem, CompletionList, Position, Uri};
use url::Url;

use crate::error::RelayResult;

/// Port to the external capability that computes completions.
///
/// Satisfied in production by the workspace-command bridge and in tests by
/// stubs. Implementations receive the canonical document locator and the
/// zero-based cursor position, and return the items exactly as the
/// capability produced them.
pub trait CompletionBackend: Send + Sync {
    fn fetch(
        &self,
        locator: &str,
        line: u32,
        character: u32,
    ) -> impl Future<Output = RelayResult<Vec<CompletionItem>>> + Send;
}

/// Forwards completion requests to a backend and shapes the results.
pub struct CompletionRelay<B> {
    backend: B,
}

impl<B: CompletionBackend> CompletionRelay<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Resolve completions for a document position.
    ///
    /// Always resolves to a well-formed list with `is_incomplete: false`:
    /// the backend's items in their original order on success, an empty list
    /// on any failure.
    pub async fn provide(&self, uri: &Uri, position: Position) -> CompletionList {
        let locator = document_locator(uri);
        match self
            .backend
            .fetch(&locator, position.line, position.character)
            .await
        {
            Ok(items) => CompletionList {
                is_incomplete: false,
                items,
            },
            Err(e) => {
                log::error!(
                    target: "mixin_ls::relay",
                    "completion lookup for {} failed: {}",
                    locator,
                    e
                );
                CompletionList {
                    is_incomplete: false,
                    items: Vec::new(),
                }
            }
        }
    }
}

/// Build the canonical document locator for a URI.
///
/// The locator is the fixed concatenation
/// `{scheme}://{authority}{path}{query}{fragment}` with percent-encoding
/// removed from every component after the scheme — the form the downstream
/// command resolves documents by. Query and fragment are appended without
/// their `?`/`#` separators. A URI that cannot be split into components is
/// passed through untouched; nothing is validated here.
pub fn document_locator(uri: &Uri) -> String {
    let raw = uri.as_str();
    let Ok(url) = Url::parse(raw) else {
        return raw.to_string();
    };

    format!(
        "{}://{}{}{}{}",
        url.scheme(),
        decode(url.authority()),
        decode(url.path()),
        url.query().map(decode).unwrap_or_default(),
        url.fragment().map(decode).unwrap_or_default(),
    )
}

fn decode(component: &str) -> Cow<'_, str> {
    percent_decode_str(component).decode_utf8_lossy()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;
    use std::sync::Mutex;

    use crate::error::RelayError;

    fn uri(s: &str) -> Uri {
        Uri::from_str(s).expect("test URI should parse")
    }

    fn item(label: &str) -> CompletionItem {
        CompletionItem {
            label: label.to_string(),
            ..CompletionItem::default()
        }
    }

    /// Backend that always returns the same items.
    struct StaticBackend {
        items: Vec<CompletionItem>,
    }

    impl CompletionBackend for StaticBackend {
        fn fetch(
            &self,
            _locator: &str,
            _line: u32,
            _character: u32,
        ) -> impl Future<Output = RelayResult<Vec<CompletionItem>>> + Send {
            let items = self.items.clone();
            async move { Ok(items) }
        }
    }

    /// Backend that always fails.
    struct FailingBackend;

    impl CompletionBackend for FailingBackend {
        fn fetch(
            &self,
            _locator: &str,
            _line: u32,
            _character: u32,
        ) -> impl Future<Output = RelayResult<Vec<CompletionItem>>> + Send {
            async move { Err(RelayError::connection_lost("downstream server exited")) }
        }
    }

    /// Backend that records the arguments it was called with.
    struct RecordingBackend {
        calls: Mutex<Vec<(String, u32, u32)>>,
    }

    impl RecordingBackend {
        fn new() -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    impl CompletionBackend for RecordingBackend {
        fn fetch(
            &self,
            locator: &str,
            line: u32,
            character: u32,
        ) -> impl Future<Output = RelayResult<Vec<CompletionItem>>> + Send {
            self.calls
                .lock()
                .unwrap()
                .push((locator.to_string(), line, character));
            async move { Ok(Vec::new()) }
        }
    }

    // ==========================================================================
    // provide tests
    // ==========================================================================

    #[tokio::test]
    async fn provide_returns_backend_items_in_order() {
        let relay = CompletionRelay::new(StaticBackend {
            items: vec![item("implements"), item("interface")],
        });

        let list = relay
            .provide(&uri("file:///a/B.java"), Position::new(10, 4))
            .await;

        assert!(!list.is_incomplete);
        assert_eq!(list.items.len(), 2);
        assert_eq!(list.items[0].label, "implements");
        assert_eq!(list.items[1].label, "interface");
    }

    #[tokio::test]
    async fn provide_maps_backend_failure_to_empty_list() {
        let relay = CompletionRelay::new(FailingBackend);

        let list = relay
            .provide(&uri("file:///a/B.java"), Position::new(0, 0))
            .await;

        assert!(!list.is_incomplete);
        assert!(list.items.is_empty());
    }

    #[tokio::test]
    async fn provide_forwards_locator_and_position() {
        let relay = CompletionRelay::new(RecordingBackend::new());

        relay
            .provide(&uri("file:///project/src/MyMixin.java"), Position::new(10, 4))
            .await;

        let calls = relay.backend().calls.lock().unwrap();
        assert_eq!(
            calls.as_slice(),
            &[("file:///project/src/MyMixin.java".to_string(), 10, 4)]
        );
    }

    #[tokio::test]
    async fn provide_with_empty_backend_result_is_empty_list() {
        let relay = CompletionRelay::new(StaticBackend { items: Vec::new() });

        let list = relay
            .provide(&uri("file:///a/B.java"), Position::new(1, 1))
            .await;

        assert!(!list.is_incomplete);
        assert!(list.items.is_empty());
    }

    // ==========================================================================
    // document locator tests
    // ==========================================================================

    #[test]
    fn locator_for_plain_file_uri() {
        assert_eq!(
            document_locator(&uri("file:///a/B.java")),
            "file:///a/B.java"
        );
    }

    #[test]
    fn locator_keeps_authority() {
        assert_eq!(
            document_locator(&uri("file://server/share/B.java")),
            "file://server/share/B.java"
        );
    }

    #[test]
    fn locator_decodes_percent_encoded_path() {
        assert_eq!(
            document_locator(&uri("file:///a/My%20Mixin.java")),
            "file:///a/My Mixin.java"
        );
    }

    #[test]
    fn locator_appends_query_and_fragment_without_separators() {
        // The components are concatenated in fixed order; `?` and `#` are
        // not reinserted.
        assert_eq!(
            document_locator(&uri("file:///a/B.java?x=1#frag")),
            "file:///a/B.javax=1frag"
        );
    }

    #[test]
    fn locator_handles_jdt_scheme() {
        // Class-file URIs produced by Java tooling carry an authority and a
        // query naming the project
        let locator = document_locator(&uri(
            "jdt://contents/rt.jar/java.lang/Object.class?%3Dproj%2Frt.jar",
        ));
        assert_eq!(locator, "jdt://contents/rt.jar/java.lang/Object.class=proj/rt.jar");
    }
}
