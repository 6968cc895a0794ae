//! Renderable content and its per-item transformation.
//!
//! A [`Table`] owns its source records behind an `Arc` and an optional [`Pipeline`]
//! fixed at construction. Transforming a table never touches the source, so the same
//! table can be transformed for several output formats at once.

use crate::error::Result;
use crate::pipeline::{ExecutionContext, ExecutionStats, Operation, Pipeline};
use crate::record::{Record, Schema};
use std::sync::Arc;

/// A titled record set with an optional transformation chain.
#[derive(Debug, Clone)]
pub struct Table {
    title: Option<String>,
    schema: Schema,
    records: Arc<[Record]>,
    pipeline: Option<Pipeline>,
}

impl Table {
    pub fn new(schema: Schema, records: impl Into<Arc<[Record]>>) -> Self {
        Self {
            title: None,
            schema,
            records: records.into(),
            pipeline: None,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Attach the transformation chain. The chain is frozen from here on.
    pub fn with_operations(mut self, operations: impl IntoIterator<Item = Operation>) -> Self {
        self.pipeline = Some(Pipeline::new(operations));
        self
    }

    pub fn with_pipeline(mut self, pipeline: Pipeline) -> Self {
        self.pipeline = Some(pipeline);
        self
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn pipeline(&self) -> Option<&Pipeline> {
        self.pipeline.as_ref()
    }

    /// Produce the records a renderer should see.
    ///
    /// Without a pipeline the source is passed through and no stats are recorded.
    pub fn transform(&self, ctx: &ExecutionContext) -> Result<TransformedTable> {
        let Some(pipeline) = &self.pipeline else {
            return Ok(TransformedTable {
                title: self.title.clone(),
                schema: self.schema.clone(),
                records: self.records.to_vec(),
                stats: None,
            });
        };

        let output = pipeline.run(&self.records, &self.schema, ctx)?;
        Ok(TransformedTable {
            title: self.title.clone(),
            schema: output.schema,
            records: output.records,
            stats: Some(output.stats),
        })
    }
}

/// A table after its pipeline ran.
#[derive(Debug, Clone, PartialEq)]
pub struct TransformedTable {
    pub title: Option<String>,
    pub schema: Schema,
    pub records: Vec<Record>,
    stats: Option<ExecutionStats>,
}

impl TransformedTable {
    /// Stats of the run, or `None` when the table had no pipeline attached.
    ///
    /// A pipeline that produced zero records still reports `Some`.
    pub fn transform_stats(&self) -> Option<&ExecutionStats> {
        self.stats.as_ref()
    }
}

/// One item of a document.
#[derive(Debug, Clone)]
pub enum Content {
    Table(Table),
    Text(String),
}

/// A content item ready for a renderer.
#[derive(Debug, Clone, PartialEq)]
pub enum RenderedContent {
    Table(TransformedTable),
    Text(String),
}

impl Content {
    pub fn transform(&self, ctx: &ExecutionContext) -> Result<RenderedContent> {
        match self {
            Self::Table(table) => table.transform(ctx).map(RenderedContent::Table),
            Self::Text(text) => Ok(RenderedContent::Text(text.clone())),
        }
    }
}

impl From<Table> for Content {
    fn from(table: Table) -> Self {
        Self::Table(table)
    }
}

/// An ordered collection of content items.
#[derive(Debug, Clone, Default)]
pub struct Document {
    contents: Vec<Content>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, content: impl Into<Content>) {
        self.contents.push(content.into());
    }

    pub fn with(mut self, content: impl Into<Content>) -> Self {
        self.push(content);
        self
    }

    pub fn contents(&self) -> &[Content] {
        &self.contents
    }

    /// Transform every item independently; one item's failure leaves the others intact.
    pub fn transform(&self, ctx: &ExecutionContext) -> Vec<Result<RenderedContent>> {
        self.contents
            .iter()
            .enumerate()
            .map(|(idx, content)| {
                let rendered = content.transform(ctx);
                if let Err(e) = &rendered {
                    tracing::warn!(item = idx, "Content transformation failed: {}", e);
                }
                rendered
            })
            .collect()
    }
}
