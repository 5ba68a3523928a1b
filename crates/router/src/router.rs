use fvi_fusion::{ContextBundle, ContextFusionEngine};
use fvi_protocol::{
    AnswerResponse, ContextRequest, ContextResponse, ErrorEnvelope, ScoreRequest, ScoreResponse,
};
use fvi_scoring::{EntityId, Persona, RankedEntity, ScoringAggregator, ScoringError};
use std::sync::Arc;
use std::time::Duration;

use crate::detect::{detect_persona, EntityDetector};
use crate::error::{Result, RouterError};
use crate::generator::Generator;
use crate::prompt::Prompt;
use crate::view::{context_view, score_view};

/// The inbound interface: validates requests, fills in persona and entity
/// signals, and calls the aggregator and the fusion engine.
pub struct QueryRouter {
    engine: Arc<ContextFusionEngine>,
    detector: EntityDetector,
    generator: Option<Arc<dyn Generator>>,
}

impl QueryRouter {
    pub fn new(engine: Arc<ContextFusionEngine>) -> Result<Self> {
        let detector = EntityDetector::new(engine.aggregator().store().aliases())?;
        Ok(Self {
            engine,
            detector,
            generator: None,
        })
    }

    #[must_use]
    pub fn with_generator(mut self, generator: Arc<dyn Generator>) -> Self {
        self.generator = Some(generator);
        self
    }

    fn aggregator(&self) -> &ScoringAggregator {
        self.engine.aggregator()
    }

    /// First entity mentioned in `query` that has scores.
    #[must_use]
    pub fn detect_entity(&self, query: &str) -> Option<EntityId> {
        let table = self.aggregator().store().snapshot();
        self.detector
            .mentions(query)
            .into_iter()
            .find(|entity| table.contains_entity(entity))
    }

    pub fn handle_score(&self, request: &ScoreRequest) -> std::result::Result<ScoreResponse, ErrorEnvelope> {
        self.score(request).map_err(|e| report("score", &e))
    }

    pub async fn handle_context(
        &self,
        request: &ContextRequest,
    ) -> std::result::Result<ContextResponse, ErrorEnvelope> {
        self.context(request)
            .await
            .map(|bundle| context_view(&bundle))
            .map_err(|e| report("context", &e))
    }

    /// Fuse context and forward it to the configured generator.
    pub async fn answer(
        &self,
        request: &ContextRequest,
    ) -> std::result::Result<AnswerResponse, ErrorEnvelope> {
        self.generate(request).await.map_err(|e| report("answer", &e))
    }

    /// Score of one entity under every configured persona, in persona order.
    pub fn compare_personas(
        &self,
        entity_id: &str,
    ) -> std::result::Result<Vec<ScoreResponse>, ErrorEnvelope> {
        self.compare(entity_id).map_err(|e| report("compare", &e))
    }

    /// Every scored entity ranked under `persona_id`, optionally cut to `limit`.
    pub fn rank(
        &self,
        persona_id: &str,
        limit: Option<usize>,
    ) -> std::result::Result<Vec<RankedEntity>, ErrorEnvelope> {
        let ranked = persona_id
            .parse::<Persona>()
            .and_then(|persona| self.aggregator().rank_all(persona))
            .map_err(|e| report("rank", &RouterError::from(e)))?;
        Ok(match limit {
            Some(n) => ranked.into_iter().take(n).collect(),
            None => ranked,
        })
    }

    fn score(&self, request: &ScoreRequest) -> Result<ScoreResponse> {
        let persona: Persona = request.persona_id.parse()?;
        let entity = self.resolve_entity(&request.entity_id)?;
        let snapshot = self.engine.score_snapshot(&entity, persona)?;
        Ok(score_view(&snapshot))
    }

    fn compare(&self, entity_id: &str) -> Result<Vec<ScoreResponse>> {
        let entity = self.resolve_entity(entity_id)?;
        self.aggregator()
            .config()
            .personas
            .keys()
            .map(|persona| Ok(score_view(&self.engine.score_snapshot(&entity, *persona)?)))
            .collect()
    }

    async fn context(&self, request: &ContextRequest) -> Result<ContextBundle> {
        let query = request.query.trim();
        if query.is_empty() {
            return Err(RouterError::InvalidRequest("query must not be empty".to_string()));
        }

        let persona = match &request.persona_id {
            Some(raw) => raw.parse::<Persona>()?,
            None => detect_persona(query),
        };
        let entity = match &request.entity_id {
            Some(raw) => Some(self.resolve_entity(raw)?),
            None => self.detect_entity(query),
        };
        log::debug!(
            "Routing '{query}' as {persona}{}",
            entity.as_ref().map(|e| format!(" about {e}")).unwrap_or_default()
        );

        let timeout = request.timeout_ms.map(Duration::from_millis);
        Ok(self
            .engine
            .fuse_with_timeout(query, persona, entity.as_ref(), timeout)
            .await?)
    }

    async fn generate(&self, request: &ContextRequest) -> Result<AnswerResponse> {
        let generator = self.generator.as_ref().ok_or(RouterError::NoGenerator)?;
        let bundle = self.context(request).await?;
        let prompt = Prompt::from_bundle(&bundle);
        log::info!(
            "Generating with {} ({} passages, {} chars of context)",
            generator.name(),
            bundle.ranked_passages.len(),
            bundle.used_chars
        );
        let answer = generator.generate(&prompt, &bundle).await?;
        Ok(AnswerResponse {
            answer,
            context: context_view(&bundle),
        })
    }

    fn resolve_entity(&self, raw: &str) -> Result<EntityId> {
        self.aggregator()
            .store()
            .aliases()
            .resolve(raw)
            .ok_or_else(|| ScoringError::UnknownEntity(raw.trim().to_string()).into())
    }
}

fn report(operation: &str, error: &RouterError) -> ErrorEnvelope {
    let envelope = error.envelope();
    if envelope.class.is_caller_error() {
        log::debug!("{operation} rejected: {error}");
    } else {
        log::warn!("{operation} failed: {error}");
    }
    envelope
}
