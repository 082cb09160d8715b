//! Implementation of `spanq search`.

use std::{process::ExitCode, sync::Arc};

use spanq_results::{SampleAmount, SampleParameters};
use spanq_search::{ResultsCache, SearchError, SearchHits};
use spanq_spans::{Corpus, MemoryCorpus, SpanQuery};

use crate::cli::{args::SearchCommand, context::CommandContext, output};

/// Searches a corpus and prints a page, the document groups or the property groups.
pub fn run(ctx: &CommandContext, cmd: &SearchCommand) -> ExitCode {
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

    match search(ctx, &cache, &corpus, query, cmd) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Builds the search chain for the options given and prints its result.
fn search(
    ctx: &CommandContext,
    cache: &ResultsCache,
    corpus: &Arc<MemoryCorpus>,
    query: SpanQuery,
    cmd: &SearchCommand,
) -> Result<ExitCode, SearchError> {
    let source: Arc<dyn Corpus> = corpus.clone();
    let mut hits = SearchHits::query(source, query, &ctx.query_settings())?;
    if let Some(params) = sample_parameters(cmd) {
        hits = hits.sample(params);
    }
    if let Some(property) = &cmd.sort {
        hits = hits.sort(property.clone(), cmd.reverse)?;
    }

    let settings = &ctx.config.results;
    if cmd.docs {
        let docs = hits
            .group_by_document(settings.default_group_cap)
            .execute(cache)?;
        return Ok(output::docs(&docs, corpus.as_ref(), cmd.json));
    }
    if let Some(property) = &cmd.group_by {
        let groups = hits
            .group_by_property(property.clone(), settings.default_group_cap)?
            .execute(cache)?;
        return Ok(output::groups(&groups, cmd.json));
    }

    let size = cmd.number.unwrap_or(settings.default_window_size);
    let page = hits.window(cmd.first, size)?.execute(cache)?;
    // The page's upstream is already complete in the cache.
    let all = hits.execute(cache)?;
    Ok(output::hits(
        &all,
        &page,
        corpus.as_ref(),
        settings.default_context_size,
        cmd.json,
    ))
}

/// Sampling requested on the command line, if any.
fn sample_parameters(cmd: &SearchCommand) -> Option<SampleParameters> {
    let amount = match (cmd.sample, cmd.sample_fraction) {
        (Some(count), _) => SampleAmount::Count(count),
        (None, Some(fraction)) => SampleAmount::Fraction(fraction),
        (None, None) => return None,
    };
    Some(match cmd.seed {
        Some(seed) => SampleParameters { amount, seed },
        None => SampleParameters::with_random_seed(amount),
    })
}
