//! Per-file reconciliation
//!
//! The driver is the boundary between the check and the host: it runs the
//! prompt, cache, backend, parse, resolve and format steps for one file and
//! reports each finding exactly once. Every failure is logged with the file
//! path and otherwise swallowed, so one bad file never affects the next.

use super::finding::parse_reply;
use super::locate::{resolve, SourceIndex};
use super::message::format_message;
use super::taxonomy::TaxonomyTable;
use super::CheckSettings;
use crate::cache::{prompt_key, CacheStats, ResponseCache};
use crate::host::{AstNode, Diagnostic, DiagnosticSink};
use crate::llm::ResponseGenerator;
use crate::prompt::build_prompt;
use std::path::{Path, PathBuf};

/// Outcome of checking one file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileReport {
    pub path: PathBuf,
    /// Diagnostics reported to the sink
    pub diagnostics: usize,
    /// Reply was served from the cache
    pub from_cache: bool,
}

impl FileReport {
    fn empty(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            diagnostics: 0,
            from_cache: false,
        }
    }
}

/// Where a reply came from
struct Reply {
    text: Option<String>,
    from_cache: bool,
}

pub struct ReconciliationDriver {
    settings: CheckSettings,
    taxonomy: TaxonomyTable,
    cache: Option<ResponseCache>,
    generator: Box<dyn ResponseGenerator>,
    template: String,
}

impl ReconciliationDriver {
    pub fn new(
        settings: CheckSettings,
        taxonomy: TaxonomyTable,
        cache: Option<ResponseCache>,
        generator: Box<dyn ResponseGenerator>,
        template: impl Into<String>,
    ) -> Self {
        let mut settings = settings;
        settings.sanitize();
        Self {
            settings,
            taxonomy,
            cache,
            generator,
            template: template.into(),
        }
    }

    pub fn settings(&self) -> &CheckSettings {
        &self.settings
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache
            .as_ref()
            .map(ResponseCache::stats)
            .unwrap_or_default()
    }

    /// Check one file. `source` is the file text and `root` the host's tree
    /// for it. Never fails; problems are logged and yield an empty report.
    pub async fn check_source(
        &mut self,
        path: &Path,
        source: &str,
        root: &AstNode,
        sink: &mut dyn DiagnosticSink,
    ) -> FileReport {
        if !self.settings.enabled {
            return FileReport::empty(path);
        }

        // Scoped to this call; nothing about the file outlives it.
        let index = SourceIndex::from_source(source);
        let prompt = build_prompt(&self.template, source);

        let reply = match self.fetch_reply(&prompt).await {
            Ok(reply) => reply,
            Err(err) => {
                log::warn!("LLM style check failed for {}: {:#}", path.display(), err);
                return FileReport::empty(path);
            }
        };

        let Some(text) = reply.text.filter(|t| !t.trim().is_empty()) else {
            log::warn!("No reply from the LLM backend for {}", path.display());
            return FileReport {
                from_cache: reply.from_cache,
                ..FileReport::empty(path)
            };
        };

        let diagnostics = self.reconcile(&text, root, &index, sink);
        log::debug!("{}: {} finding(s)", path.display(), diagnostics);
        FileReport {
            path: path.to_path_buf(),
            diagnostics,
            from_cache: reply.from_cache,
        }
    }

    /// Turn a reply into diagnostics, one per visible finding
    pub fn reconcile(
        &self,
        reply: &str,
        root: &AstNode,
        source: &SourceIndex,
        sink: &mut dyn DiagnosticSink,
    ) -> usize {
        let findings = parse_reply(reply, &self.taxonomy, self.settings.show_warnings);
        let count = findings.len();
        for finding in findings {
            let location = resolve(
                finding.target_line,
                finding.identifier_hint.as_deref(),
                root,
                source,
                &self.settings,
            );
            let message = format_message(&finding, source);
            sink.report(Diagnostic {
                severity: finding.severity,
                location,
                template: message.template,
                argument: message.argument,
            });
        }
        count
    }

    async fn fetch_reply(&mut self, prompt: &str) -> anyhow::Result<Reply> {
        let key = prompt_key(prompt);

        if let Some(text) = self.cache.as_mut().and_then(|cache| cache.get(&key)) {
            return Ok(Reply {
                text: Some(text),
                from_cache: true,
            });
        }

        let text = self.generator.generate_response(prompt).await?;
        if let (Some(cache), Some(text)) = (self.cache.as_mut(), text.as_deref()) {
            cache.put(&key, text);
        }
        Ok(Reply {
            text,
            from_cache: false,
        })
    }
}
