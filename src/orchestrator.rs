//! Request pipeline for Cinequery.
//!
//! Coordinates a question from instruction prefix through the semantic cache,
//! retrieved context and (optionally) tool dispatch to the final answer.

use crate::agent::ToolDispatchLoop;
use crate::cache::{CacheGate, CacheLookup};
use crate::capabilities::{CapabilityOutcome, CapabilityRegistry, MovieFactsClient};
use crate::completion::{CompletionProvider, OpenAICompletion, Turn};
use crate::config::{PromptBuilder, Settings};
use crate::embedding::{Embedder, OpenAIEmbedder};
use crate::error::{CineError, Result};
use crate::openai::create_client;
use crate::question::{Answer, Question};
use crate::rag::{format_context_for_prompt, ContextBuilder};
use crate::vector_store::{CacheStore, MemoryVectorStore, Movie, MovieIndex, SqliteVectorStore};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument};

/// A movie record as found in an index source file.
#[derive(Debug, Clone, Deserialize)]
pub struct MovieRecord {
    pub title: String,
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub genre: Option<String>,
    pub plot: String,
}

impl MovieRecord {
    /// Text embedded for retrieval.
    fn embedding_text(&self) -> String {
        format!("{}: {}", self.title, self.plot)
    }
}

/// The question-answering pipeline.
pub struct Orchestrator {
    embedder: Arc<dyn Embedder>,
    completion: Arc<dyn CompletionProvider>,
    movies: Option<Arc<dyn MovieIndex>>,
    cache: Option<CacheGate>,
    context: Option<ContextBuilder>,
    dispatch: ToolDispatchLoop,
    tools_enabled: bool,
    deadline: Duration,
}

impl Orchestrator {
    /// Create an orchestrator backed by OpenAI and the configured store.
    pub fn new(settings: &Settings) -> Result<Self> {
        let client = create_client(&settings.openai)?;

        let embedder: Arc<dyn Embedder> = Arc::new(OpenAIEmbedder::new(
            client.clone(),
            &settings.embedding.model,
            settings.embedding.dimensions as usize,
        ));
        let completion: Arc<dyn CompletionProvider> =
            Arc::new(OpenAICompletion::new(client, &settings.completion.model));

        let facts = Arc::new(MovieFactsClient::new(
            &settings.capabilities.base_url,
            settings.capabilities.timeout_secs,
        )?);
        let capabilities = CapabilityRegistry::movie_facts(facts);

        let (cache_store, movies) = open_store(settings)?;

        let mut orchestrator = Self::with_components(embedder.clone(), completion, capabilities)
            .with_movie_index(movies.clone())
            .with_tools_enabled(settings.agent.tools_enabled)
            .with_deadline(settings.limits.request_deadline());

        if settings.cache.enabled {
            orchestrator = orchestrator.with_cache(CacheGate::with_settings(
                embedder.clone(),
                cache_store,
                &settings.cache,
            ));
        }

        if settings.retrieval.enabled {
            orchestrator = orchestrator.with_context(
                ContextBuilder::new(movies, embedder).with_max_movies(settings.retrieval.top_k),
            );
        }

        info!(
            "Pipeline ready (cache: {}, retrieval: {}, tools: {})",
            settings.cache.enabled, settings.retrieval.enabled, settings.agent.tools_enabled
        );

        Ok(orchestrator)
    }

    /// Create an orchestrator from explicit providers. Cache, retrieval and
    /// tools start disabled.
    pub fn with_components(
        embedder: Arc<dyn Embedder>,
        completion: Arc<dyn CompletionProvider>,
        capabilities: CapabilityRegistry,
    ) -> Self {
        Self {
            embedder,
            dispatch: ToolDispatchLoop::new(completion.clone(), capabilities),
            completion,
            movies: None,
            cache: None,
            context: None,
            tools_enabled: false,
            deadline: Duration::from_secs(120),
        }
    }

    /// Put a semantic cache in front of the pipeline.
    ///
    /// The gate is expected to share the pipeline's embedder: a miss's
    /// embedding is reused for retrieval and for storing the answer.
    pub fn with_cache(mut self, cache: CacheGate) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Ground answers in retrieved movie context.
    pub fn with_context(mut self, context: ContextBuilder) -> Self {
        self.context = Some(context);
        self
    }

    /// Movie index that [`Orchestrator::index_movies`] writes to.
    pub fn with_movie_index(mut self, movies: Arc<dyn MovieIndex>) -> Self {
        self.movies = Some(movies);
        self
    }

    /// Let the model call the registered capabilities.
    pub fn with_tools_enabled(mut self, enabled: bool) -> Self {
        self.tools_enabled = enabled;
        self
    }

    /// Overall deadline for a single question.
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }

    pub fn capabilities(&self) -> &CapabilityRegistry {
        self.dispatch.registry()
    }

    /// Answer a question within the configured deadline.
    #[instrument(skip(self, question), fields(kind = %question.kind))]
    pub async fn ask(&self, question: &Question) -> Result<Answer> {
        if question.text.trim().is_empty() {
            return Err(CineError::InvalidInput("Question must not be empty".to_string()));
        }

        tokio::time::timeout(self.deadline, self.answer(question))
            .await
            .map_err(|_| CineError::DeadlineExceeded(self.deadline))?
    }

    async fn answer(&self, question: &Question) -> Result<Answer> {
        let prefix = PromptBuilder::instruction_prefix(question.kind);

        let mut embedding = None;
        if let Some(cache) = &self.cache {
            match cache.lookup(&question.text).await? {
                CacheLookup::Hit { entry, .. } => {
                    return Ok(Answer::from_cache(&entry, question.correlation_token.clone()));
                }
                CacheLookup::Miss { embedding: e } => embedding = Some(e),
            }
        }

        let context = match &self.context {
            Some(builder) => {
                let chunks = match &embedding {
                    Some(e) => builder.build_with_embedding(e).await?,
                    None => builder.build(&question.text).await?,
                };
                Some(format_context_for_prompt(&chunks)).filter(|c| !c.is_empty())
            }
            None => None,
        };

        let (text, usage) = if self.tools_enabled {
            let instruction = PromptBuilder::dispatch_instruction(&prefix, context.as_deref());
            let outcome = self.dispatch.run(&question.text, &instruction).await?;
            debug!(
                "Dispatch used {} tokens in total across {} tool calls",
                outcome.total_usage().total(),
                outcome.invocations().len()
            );
            (outcome.text(), outcome.usage())
        } else {
            let prompt = PromptBuilder::compose(&prefix, context.as_deref(), &question.text);
            let completion = self.completion.complete(&[Turn::requester(prompt)], None).await?;
            (completion.text(), completion.usage)
        };

        info!(
            "Answered with {} prompt / {} completion tokens",
            usage.prompt_tokens, usage.completion_tokens
        );

        if let Some(cache) = &self.cache {
            match &embedding {
                Some(e) => cache.store_embedded(&question.text, &text, e).await?,
                None => cache.store(&question.text, &text).await?,
            };
        }

        Ok(Answer::from_completion(
            text,
            usage,
            question.correlation_token.clone(),
        ))
    }

    /// Run a single registered capability directly.
    pub async fn lookup(&self, capability: &str, title: &str) -> Result<CapabilityOutcome> {
        let capability = self
            .capabilities()
            .get(capability)
            .ok_or_else(|| CineError::ToolNotFound(capability.to_string()))?;
        Ok(capability.lookup(title).await)
    }

    /// Embed and index movie records for retrieval.
    #[instrument(skip(self, records), fields(count = records.len()))]
    pub async fn index_movies(&self, records: Vec<MovieRecord>) -> Result<usize> {
        let movies = self
            .movies
            .as_ref()
            .ok_or_else(|| CineError::Config("No movie index configured".to_string()))?;

        if records.is_empty() {
            return Ok(0);
        }

        let texts: Vec<String> = records.iter().map(MovieRecord::embedding_text).collect();
        let embeddings = self.embedder.embed_batch(&texts).await?;

        let batch: Vec<Movie> = records
            .into_iter()
            .zip(embeddings)
            .map(|(record, embedding)| {
                Movie::new(record.title, record.year, record.genre, record.plot, embedding)
            })
            .collect();

        let count = movies.upsert_movies(&batch).await?;
        info!("Indexed {} movies", count);
        Ok(count)
    }

    /// Number of cached answers, or `None` when the cache is disabled.
    pub async fn cache_len(&self) -> Result<Option<usize>> {
        match &self.cache {
            Some(cache) => Ok(Some(cache.len().await?)),
            None => Ok(None),
        }
    }
}

/// Open the configured store. One backend serves both collections.
pub fn open_store(settings: &Settings) -> Result<(Arc<dyn CacheStore>, Arc<dyn MovieIndex>)> {
    match settings.vector_store.provider.as_str() {
        "memory" => {
            let store = Arc::new(MemoryVectorStore::new());
            let cache: Arc<dyn CacheStore> = store.clone();
            let movies: Arc<dyn MovieIndex> = store;
            Ok((cache, movies))
        }
        "sqlite" => {
            let path = settings.sqlite_path();
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let store = Arc::new(SqliteVectorStore::new(&path)?);
            let cache: Arc<dyn CacheStore> = store.clone();
            let movies: Arc<dyn MovieIndex> = store;
            Ok((cache, movies))
        }
        other => Err(CineError::Config(format!(
            "Unknown vector store provider: {} (expected sqlite or memory)",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capabilities::CapabilitySpec;
    use crate::completion::{Completion, Role};
    use crate::question::{QuestionType, TokenUsage};
    use crate::testing::{tool_call, FakeEmbedder, RecordingCapability, ScriptedCompletion};
    use async_trait::async_trait;

    const DIRECTED: &str = "Who directed Inception?";

    fn pipeline(
        embedder: FakeEmbedder,
        completion: Arc<ScriptedCompletion>,
        capabilities: CapabilityRegistry,
    ) -> (Orchestrator, Arc<MemoryVectorStore>) {
        let embedder = Arc::new(embedder);
        let store = Arc::new(MemoryVectorStore::new());
        let orchestrator = Orchestrator::with_components(embedder.clone(), completion, capabilities)
            .with_movie_index(store.clone())
            .with_cache(CacheGate::new(embedder, store.clone()));
        (orchestrator, store)
    }

    #[tokio::test]
    async fn test_true_or_false_prompt() {
        let completion = Arc::new(ScriptedCompletion::new(vec![ScriptedCompletion::text(
            "true",
            TokenUsage::new(30, 1),
        )]));
        let orchestrator = Orchestrator::with_components(
            Arc::new(FakeEmbedder::new()),
            completion.clone(),
            CapabilityRegistry::new(),
        );

        let question = Question::new("Is Titanic a romance?", QuestionType::TrueOrFalse)
            .with_correlation_token(Some("abc-123".to_string()));
        let answer = orchestrator.ask(&question).await.unwrap();

        assert_eq!(answer.answer, "true");
        assert_eq!(answer.correlation_token.as_deref(), Some("abc-123"));
        assert_eq!(answer.prompt_tokens_used, Some(30));
        assert_eq!(answer.completion_tokens_used, Some(1));

        let calls = completion.calls();
        assert_eq!(calls.len(), 1);
        let prompt = &calls[0].transcript[0];
        assert_eq!(prompt.role, Role::Requester);
        assert!(prompt.content.starts_with(
            "Is the following statement true or false: answer in true or false in lower case"
        ));
        assert!(prompt.content.ends_with("Question: Is Titanic a romance?"));
    }

    #[tokio::test]
    async fn test_tool_assisted_answer_uses_follow_up() {
        let completion = Arc::new(ScriptedCompletion::new(vec![
            ScriptedCompletion::tools(
                vec![tool_call("call_1", "get_movie_rating", "Inception")],
                TokenUsage::new(90, 15),
            ),
            ScriptedCompletion::text("8.8", TokenUsage::new(120, 3)),
        ]));
        let rating = Arc::new(RecordingCapability::found("get_movie_rating", "8.8"));
        let orchestrator = Orchestrator::with_components(
            Arc::new(FakeEmbedder::new()),
            completion.clone(),
            CapabilityRegistry::new().with(rating.clone()),
        )
        .with_tools_enabled(true);

        let question = Question::new("What is the rating of Inception?", QuestionType::Estimation);
        let answer = orchestrator.ask(&question).await.unwrap();

        assert_eq!(answer.answer, "8.8");
        assert_eq!(answer.prompt_tokens_used, Some(120));
        assert_eq!(answer.completion_tokens_used, Some(3));
        assert_eq!(completion.call_count(), 2);
        assert_eq!(rating.titles(), vec!["Inception".to_string()]);

        let system = &completion.calls()[0].transcript[1];
        assert_eq!(system.role, Role::System);
        assert!(system.content.contains("Please estimate the value of: Answer only in numbers."));
    }

    #[tokio::test]
    async fn test_cache_hit_skips_completion() {
        let completion = Arc::new(ScriptedCompletion::new(Vec::new()));
        let embedder = FakeEmbedder::new().with("Who was the director of Inception?", vec![0.95, 0.312]);
        let (orchestrator, store) = pipeline(embedder, completion.clone(), CapabilityRegistry::new());
        store
            .insert_entry(DIRECTED, "Christopher Nolan", &[1.0, 0.0])
            .await
            .unwrap();

        let question = Question::new("Who was the director of Inception?", QuestionType::PopularChoice);
        let answer = orchestrator.ask(&question).await.unwrap();

        assert_eq!(answer.answer, "Christopher Nolan");
        assert_eq!(answer.prompt_tokens_used, None);
        assert_eq!(answer.completion_tokens_used, None);
        assert_eq!(completion.call_count(), 0);
        assert_eq!(orchestrator.cache_len().await.unwrap(), Some(1));
    }

    #[tokio::test]
    async fn test_cache_miss_answers_and_stores_next_id() {
        let completion = Arc::new(ScriptedCompletion::new(vec![ScriptedCompletion::text(
            "1997",
            TokenUsage::new(25, 2),
        )]));
        // cos([1,0],[0.4,0.9165]) ~= 0.4
        let embedder = FakeEmbedder::new().with("When was Titanic released?", vec![0.4, 0.9165]);
        let (orchestrator, store) = pipeline(embedder, completion.clone(), CapabilityRegistry::new());
        store
            .insert_entry(DIRECTED, "Christopher Nolan", &[1.0, 0.0])
            .await
            .unwrap();

        let question = Question::new("When was Titanic released?", QuestionType::Estimation);
        let answer = orchestrator.ask(&question).await.unwrap();

        assert_eq!(answer.answer, "1997");
        assert_eq!(completion.call_count(), 1);

        let hits = store.search_entries(&[0.4, 0.9165], 5, 0.99).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].entry.id, 2);
        assert_eq!(hits[0].entry.answer, "1997");
    }

    #[tokio::test]
    async fn test_unknown_tool_fails_request_and_skips_cache_write() {
        let completion = Arc::new(ScriptedCompletion::new(vec![
            ScriptedCompletion::tools(
                vec![tool_call("call_1", "get_movie_budget", "Inception")],
                TokenUsage::new(40, 8),
            ),
            ScriptedCompletion::text("unused", TokenUsage::default()),
        ]));
        let rating = Arc::new(RecordingCapability::found("get_movie_rating", "8.8"));
        let (orchestrator, _) = pipeline(
            FakeEmbedder::new(),
            completion.clone(),
            CapabilityRegistry::new().with(rating.clone()),
        );
        let orchestrator = orchestrator.with_tools_enabled(true);

        let question = Question::new("What was the budget of Inception?", QuestionType::Estimation);
        let err = orchestrator.ask(&question).await.unwrap_err();

        assert!(matches!(err, CineError::ToolNotFound(ref name) if name == "get_movie_budget"));
        assert_eq!(completion.call_count(), 1);
        assert!(rating.titles().is_empty());
        assert_eq!(orchestrator.cache_len().await.unwrap(), Some(0));
    }

    #[tokio::test]
    async fn test_retrieved_context_reuses_cache_embedding() {
        let completion = Arc::new(ScriptedCompletion::new(vec![ScriptedCompletion::text(
            "b",
            TokenUsage::new(200, 1),
        )]));
        let embedder = Arc::new(FakeEmbedder::new().with("Which ship sinks?", vec![0.0, 1.0]));
        let store = Arc::new(MemoryVectorStore::new());
        store
            .upsert_movie(&Movie::new(
                "Titanic".to_string(),
                Some(1997),
                Some("Romance".to_string()),
                "A ship hits an iceberg.".to_string(),
                vec![0.0, 1.0],
            ))
            .await
            .unwrap();

        let orchestrator = Orchestrator::with_components(embedder.clone(), completion.clone(), CapabilityRegistry::new())
            .with_cache(CacheGate::new(embedder.clone(), store.clone()))
            .with_context(ContextBuilder::new(store.clone(), embedder.clone()));

        let question = Question::new("Which ship sinks?", QuestionType::MultipleChoice);
        orchestrator.ask(&question).await.unwrap();

        let prompt = &completion.calls()[0].transcript[0].content;
        assert!(prompt.contains(
            "Context: Movie Title: Titanic Release Year: 1997 Movie Plot: A ship hits an iceberg. Question: Which ship sinks?"
        ));
        assert_eq!(embedder.call_count(), 1);
    }

    #[tokio::test]
    async fn test_empty_question_is_invalid_input() {
        let completion = Arc::new(ScriptedCompletion::new(Vec::new()));
        let orchestrator = Orchestrator::with_components(
            Arc::new(FakeEmbedder::new()),
            completion.clone(),
            CapabilityRegistry::new(),
        );

        let err = orchestrator
            .ask(&Question::new("   ", QuestionType::Unrecognized))
            .await
            .unwrap_err();
        assert!(matches!(err, CineError::InvalidInput(_)));
        assert_eq!(completion.call_count(), 0);
    }

    struct StalledCompletion;

    #[async_trait]
    impl CompletionProvider for StalledCompletion {
        async fn complete(&self, _: &[Turn], _: Option<&[CapabilitySpec]>) -> Result<Completion> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(Completion::default())
        }
    }

    #[tokio::test]
    async fn test_deadline_exceeded() {
        let orchestrator = Orchestrator::with_components(
            Arc::new(FakeEmbedder::new()),
            Arc::new(StalledCompletion),
            CapabilityRegistry::new(),
        )
        .with_deadline(Duration::from_millis(50));

        let err = orchestrator
            .ask(&Question::new("Is Alien a horror film?", QuestionType::TrueOrFalse))
            .await
            .unwrap_err();
        assert!(matches!(err, CineError::DeadlineExceeded(_)));
    }

    #[tokio::test]
    async fn test_lookup_runs_registered_capability() {
        let actor = Arc::new(RecordingCapability::found("get_movie_actor", "Sam Neill"));
        let orchestrator = Orchestrator::with_components(
            Arc::new(FakeEmbedder::new()),
            Arc::new(ScriptedCompletion::new(Vec::new())),
            CapabilityRegistry::new().with(actor.clone()),
        );

        let outcome = orchestrator.lookup("get_movie_actor", "Jurassic Park").await.unwrap();
        assert_eq!(outcome.as_text(), "Sam Neill");
        assert_eq!(actor.titles(), vec!["Jurassic Park".to_string()]);

        let err = orchestrator.lookup("get_movie_budget", "Jurassic Park").await.unwrap_err();
        assert!(matches!(err, CineError::ToolNotFound(_)));
    }

    #[tokio::test]
    async fn test_index_movies() {
        let (orchestrator, store) = pipeline(
            FakeEmbedder::new().with("Alien: A crew meets a creature.", vec![1.0, 0.0]),
            Arc::new(ScriptedCompletion::new(Vec::new())),
            CapabilityRegistry::new(),
        );

        let records: Vec<MovieRecord> = serde_json::from_str(
            r#"[
                {"title": "Alien", "year": 1979, "genre": "Horror", "plot": "A crew meets a creature."},
                {"title": "Up", "plot": "A house floats away."}
            ]"#,
        )
        .unwrap();

        assert_eq!(orchestrator.index_movies(records).await.unwrap(), 2);
        assert_eq!(store.movie_count().await.unwrap(), 2);

        let nearest = store.search_movies(&[1.0, 0.0], 1).await.unwrap();
        assert_eq!(nearest[0].movie.title, "Alien");
        assert_eq!(nearest[0].movie.year, Some(1979));
    }

    #[test]
    fn test_open_store_rejects_unknown_provider() {
        let mut settings = Settings::default();
        settings.vector_store.provider = "pinecone".to_string();
        assert!(matches!(open_store(&settings), Err(CineError::Config(_))));
    }
}
