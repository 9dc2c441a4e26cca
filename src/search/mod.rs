//! Tantivy-based search index module.
//!
//! Provides full-text search over tasks with field boosting.

use std::path::Path;
use std::sync::Arc;
use tantivy::collector::TopDocs;
use tantivy::query::{BooleanQuery, BoostQuery, Occur, QueryParser};
use tantivy::schema::{Field, Schema, Value, STORED, STRING, TEXT};
use tantivy::{doc, Index, IndexReader, IndexWriter, ReloadPolicy, TantivyDocument};
use tokio::sync::RwLock;

use crate::errors::AppError;
use crate::models::Task;

/// Field boost values.
const BOOST_TITLE: f32 = 10.0;
const BOOST_DESCRIPTION: f32 = 6.0;
const BOOST_COMMENTS: f32 = 3.0;
const BOOST_ATTACHMENTS: f32 = 2.0;

/// Search result with task id and relevance score.
#[derive(Debug, Clone)]
pub struct SearchResult {
    pub task_id: String,
    pub score: f32,
}

/// Search index schema fields.
struct SearchFields {
    task_id: Field,
    title: Field,
    description: Field,
    comments: Field,
    attachments: Field,
}

/// Tantivy search index for tasks.
pub struct SearchIndex {
    index: Index,
    reader: IndexReader,
    writer: Arc<RwLock<IndexWriter>>,
    fields: SearchFields,
}

impl SearchIndex {
    /// Create or open a search index at the specified path.
    pub fn open(index_path: &Path) -> Result<Self, AppError> {
        std::fs::create_dir_all(index_path)
            .map_err(|e| AppError::Search(format!("Failed to create index directory: {}", e)))?;

        let mut schema_builder = Schema::builder();
        let task_id = schema_builder.add_text_field("task_id", STRING | STORED);
        let title = schema_builder.add_text_field("title", TEXT | STORED);
        let description = schema_builder.add_text_field("description", TEXT);
        let comments = schema_builder.add_text_field("comments", TEXT);
        let attachments = schema_builder.add_text_field("attachments", TEXT);
        let schema = schema_builder.build();

        let fields = SearchFields {
            task_id,
            title,
            description,
            comments,
            attachments,
        };

        let index = Index::open_in_dir(index_path)
            .or_else(|_| Index::create_in_dir(index_path, schema.clone()))
            .map_err(|e| AppError::Search(format!("Failed to open/create index: {}", e)))?;

        let reader = index
            .reader_builder()
            .reload_policy(ReloadPolicy::OnCommitWithDelay)
            .try_into()
            .map_err(|e| AppError::Search(format!("Failed to create reader: {}", e)))?;

        let writer = index
            .writer(50_000_000) // 50MB buffer
            .map_err(|e| AppError::Search(format!("Failed to create writer: {}", e)))?;

        Ok(Self {
            index,
            reader,
            writer: Arc::new(RwLock::new(writer)),
            fields,
        })
    }

    /// Rebuild the entire index from tasks.
    pub async fn rebuild(&self, tasks: &[Task]) -> Result<(), AppError> {
        let mut writer = self.writer.write().await;

        writer.delete_all_documents()?;
        for task in tasks {
            writer.add_document(self.create_document(task))?;
        }
        writer.commit()?;

        self.reader.reload()?;

        tracing::info!("Search index rebuilt with {} tasks", tasks.len());
        Ok(())
    }

    /// Index or re-index the given tasks in one commit.
    pub async fn index_tasks(&self, tasks: &[Task]) -> Result<(), AppError> {
        let mut writer = self.writer.write().await;

        for task in tasks {
            writer.delete_term(tantivy::Term::from_field_text(self.fields.task_id, &task.id));
            writer.add_document(self.create_document(task))?;
        }
        writer.commit()?;

        self.reader.reload()?;
        Ok(())
    }

    /// Index or re-index a single task.
    pub async fn index_task(&self, task: &Task) -> Result<(), AppError> {
        self.index_tasks(std::slice::from_ref(task)).await
    }

    /// Remove a task from the index.
    pub async fn remove_task(&self, task_id: &str) -> Result<(), AppError> {
        let mut writer = self.writer.write().await;

        writer.delete_term(tantivy::Term::from_field_text(self.fields.task_id, task_id));
        writer.commit()?;

        self.reader.reload()?;
        Ok(())
    }

    /// Search for tasks matching the query.
    pub fn search(
        &self,
        query_str: &str,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<SearchResult>, AppError> {
        if query_str.trim().is_empty() {
            return Ok(Vec::new());
        }

        let searcher = self.reader.searcher();

        let query_parser = QueryParser::for_index(
            &self.index,
            vec![
                self.fields.title,
                self.fields.description,
                self.fields.comments,
                self.fields.attachments,
            ],
        );
        let base_query = query_parser
            .parse_query(query_str)
            .map_err(|e| AppError::Search(format!("Invalid search query: {}", e)))?;

        let field_queries = [
            (self.fields.title, BOOST_TITLE),
            (self.fields.description, BOOST_DESCRIPTION),
            (self.fields.comments, BOOST_COMMENTS),
            (self.fields.attachments, BOOST_ATTACHMENTS),
        ];

        let mut subqueries: Vec<(Occur, Box<dyn tantivy::query::Query>)> = Vec::new();
        for (field, boost) in field_queries {
            let field_parser = QueryParser::for_index(&self.index, vec![field]);
            if let Ok(field_query) = field_parser.parse_query(query_str) {
                subqueries.push((Occur::Should, Box::new(BoostQuery::new(field_query, boost))));
            }
        }

        let combined_query = if subqueries.is_empty() {
            base_query
        } else {
            Box::new(BooleanQuery::new(subqueries))
        };

        let top_docs = searcher
            .search(&combined_query, &TopDocs::with_limit(limit + offset))
            .map_err(|e| AppError::Search(format!("Search failed: {}", e)))?;

        let results = top_docs
            .into_iter()
            .skip(offset)
            .take(limit)
            .filter_map(|(score, doc_address)| {
                let doc: TantivyDocument = searcher.doc(doc_address).ok()?;
                let task_id = doc.get_first(self.fields.task_id)?.as_str()?.to_string();
                Some(SearchResult { task_id, score })
            })
            .collect();

        Ok(results)
    }

    fn create_document(&self, task: &Task) -> TantivyDocument {
        let comments = task
            .comments
            .iter()
            .map(|c| c.text.as_str())
            .collect::<Vec<_>>()
            .join("\n");
        let attachments = task
            .attachments
            .iter()
            .map(|a| a.name.as_str())
            .collect::<Vec<_>>()
            .join(" ");

        doc!(
            self.fields.task_id => task.id.clone(),
            self.fields.title => task.title.clone(),
            self.fields.description => task.description.clone(),
            self.fields.comments => comments,
            self.fields.attachments => attachments
        )
    }
}
