//! Implementation of `spanq collocations`.

use std::{process::ExitCode, sync::Arc};

use spanq_search::{ResultsCache, SearchError, SearchHits};
use spanq_spans::{Corpus, MatchSensitivity, MemoryCorpus, SpanQuery};

use crate::cli::{args::CollocationsCommand, context::CommandContext, output};

/// Counts the terms around the hits of a query.
pub fn run(ctx: &CommandContext, cmd: &CollocationsCommand) -> ExitCode {
    let corpus = match ctx.load_corpus(&cmd.input.corpus) {
        Ok(corpus) => corpus,
        Err(code) => return code,
    };
    let query = match ctx.parse_query(&cmd.input.query) {
        Ok(query) => query,
        Err(code) => return code,
    };
    let cache = match ctx.cache() {
        Ok(cache) => cache,
        Err(code) => return code,
    };

    match collocations(ctx, &cache, &corpus, query, cmd) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Runs the query and counts its collocates.
fn collocations(
    ctx: &CommandContext,
    cache: &ResultsCache,
    corpus: &Arc<MemoryCorpus>,
    query: SpanQuery,
    cmd: &CollocationsCommand,
) -> Result<ExitCode, SearchError> {
    let settings = &ctx.config.results;
    let context = cmd
        .context
        .unwrap_or_else(|| u32::try_from(settings.default_context_size).unwrap_or(u32::MAX));
    let sensitivity = if cmd.insensitive {
        MatchSensitivity::Insensitive
    } else {
        MatchSensitivity::Sensitive
    };

    let source: Arc<dyn Corpus> = corpus.clone();
    let result = SearchHits::query(source, query, &ctx.query_settings())?
        .collocations(&cmd.annotation, context, sensitivity)?
        .execute(cache)?;
    let limit = cmd.number.unwrap_or(settings.default_window_size);
    Ok(output::collocations(&result, limit, cmd.json))
}
