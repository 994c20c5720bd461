//! A review workspace: a refinement session wired to a search channel.

use std::sync::Arc;

use litreview_core::{
    FilterField, ParsedFragment, QueryParser, RefinementSession, RelatedPaper, SearchIntent,
    SearchRequest, SessionError,
};
use litreview_core::search::DEFAULT_RELATED_K;
use tokio::task::JoinHandle;

use crate::search::{Delivery, SearchChannel};
use crate::service::{SearchService, ServiceError};

/// Every operation that changes the filters issues a search. The nonce is
/// taken synchronously, so searches are ordered by call order no matter how
/// their spawned requests interleave.
pub struct ReviewWorkspace<P, S> {
    session: RefinementSession<P>,
    channel: SearchChannel<S>,
    mode: Option<String>,
}

impl<P: QueryParser, S: SearchService + 'static> ReviewWorkspace<P, S> {
    pub fn new(parser: P, service: Arc<S>) -> Self {
        Self {
            session: RefinementSession::new(parser),
            channel: SearchChannel::new(service),
            mode: None,
        }
    }

    /// Retrieval mode sent with every search instead of the default.
    pub fn with_mode(mut self, mode: impl Into<String>) -> Self {
        self.mode = Some(mode.into());
        self
    }

    pub fn session(&self) -> &RefinementSession<P> {
        &self.session
    }

    pub fn channel(&self) -> &SearchChannel<S> {
        &self.channel
    }

    pub fn toggle_advanced(&mut self) -> bool {
        self.session.toggle_advanced()
    }

    pub fn search(&mut self, utterance: &str) -> Result<JoinHandle<Delivery>, SessionError> {
        let intent = self.session.search(utterance)?;
        Ok(self.dispatch(intent))
    }

    pub fn refine(&mut self, utterance: &str) -> Result<JoinHandle<Delivery>, SessionError> {
        let intent = self.session.refine(utterance)?;
        Ok(self.dispatch(intent))
    }

    pub fn apply(&mut self, fragment: &ParsedFragment) -> JoinHandle<Delivery> {
        let intent = self.session.apply(fragment);
        self.dispatch(intent)
    }

    pub fn remove_constraint(
        &mut self,
        field: FilterField,
        value: Option<&str>,
    ) -> JoinHandle<Delivery> {
        let intent = self.session.remove_constraint(field, value);
        self.dispatch(intent)
    }

    pub fn clear_all(&mut self) -> JoinHandle<Delivery> {
        let intent = self.session.clear_all();
        self.dispatch(intent)
    }

    /// Papers related to one paper of the current result.
    pub async fn related(&self, paper_id: &str) -> Result<Vec<RelatedPaper>, ServiceError> {
        self.channel
            .service()
            .related(paper_id, DEFAULT_RELATED_K)
            .await
    }

    /// Ask a question grounded in the papers of the current result.
    pub async fn ask(&self, question: &str) -> Result<String, ServiceError> {
        let paper_ids: Vec<String> = self
            .channel
            .snapshot()
            .result
            .map(|r| r.papers.into_iter().map(|p| p.id).collect())
            .unwrap_or_default();
        self.channel.service().ask(question, &paper_ids).await
    }

    fn dispatch(&self, intent: SearchIntent) -> JoinHandle<Delivery> {
        let mut request = SearchRequest::from_intent(&intent);
        if let Some(mode) = &self.mode {
            request = request.with_mode(mode.clone());
        }
        let nonce = self.channel.begin(intent.mode);
        let channel = self.channel.clone();
        tokio::spawn(async move { channel.resolve(nonce, &request).await })
    }
}
