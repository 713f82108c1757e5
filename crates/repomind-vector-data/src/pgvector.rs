//! Postgres/pgvector implementation of [`VectorStore`]
//!
//! Vectors live in a `vector(768)` column and travel as `$n::vector`
//! text casts, so the standard sqlx Postgres driver is enough. All
//! writes for one ingestion happen inside a single transaction holding
//! `pg_advisory_xact_lock(hashtext(repo_id))`.

use async_trait::async_trait;
use chrono::Utc;
use repomind_common::CorrelationId;
use repomind_meta_data::{IndexStatus, RepoIndexRecord};
use repomind_parsing::Chunk;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Postgres, QueryBuilder, Row};

use crate::error::{VectorDataError, VectorDataResult};
use crate::traits::{
    ScoredChunk, SearchQuery, VectorStore, WriteContext, WriteOutcome, WriteStrategy,
};

/// Rows per bulk INSERT statement
const INSERT_BATCH_ROWS: usize = 500;

/// pgvector-backed chunk store
pub struct PgVectorStore {
    pool: PgPool,
    /// Model this deployment's store is declared for; writes carrying a
    /// different tag are refused before touching any row
    declared_model: String,
    dimension: usize,
}

impl PgVectorStore {
    pub const fn new(pool: PgPool, declared_model: String, dimension: usize) -> Self {
        Self {
            pool,
            declared_model,
            dimension,
        }
    }

    fn validate(&self, chunks: &[Chunk], context: &WriteContext) -> VectorDataResult<()> {
        if context.model != self.declared_model {
            return Err(VectorDataError::SchemaMismatch(format!(
                "store is declared for '{}', write carries '{}'",
                self.declared_model, context.model
            )));
        }
        for chunk in chunks {
            let Some(embedding) = &chunk.embedding else {
                return Err(VectorDataError::MissingEmbedding(chunk.id));
            };
            if embedding.len() != self.dimension {
                return Err(VectorDataError::SchemaMismatch(format!(
                    "vector width {} does not match store width {}",
                    embedding.len(),
                    self.dimension
                )));
            }
        }
        Ok(())
    }

    async fn mark_failed(&self, repo_id: &str) {
        let result = sqlx::query(
            "UPDATE repo_index SET status = 'failed', updated_at = now() WHERE repo_id = $1",
        )
        .bind(repo_id)
        .execute(&self.pool)
        .await;
        if let Err(e) = result {
            tracing::error!(repo_id, error = %e, "could not mark index failed");
        }
    }
}

/// pgvector text literal: `[v1,v2,...]`
fn vector_literal(values: &[f32]) -> String {
    let mut literal = String::with_capacity(values.len() * 10 + 2);
    literal.push('[');
    for (i, value) in values.iter().enumerate() {
        if i > 0 {
            literal.push(',');
        }
        literal.push_str(&value.to_string());
    }
    literal.push(']');
    literal
}

fn index_from_row(row: &PgRow) -> VectorDataResult<RepoIndexRecord> {
    let status: String = row.try_get("status")?;
    Ok(RepoIndexRecord {
        repo_id: row.try_get("repo_id")?,
        status: status.parse().unwrap_or(IndexStatus::Pending),
        commit_hash: row.try_get("commit_hash")?,
        default_branch: row.try_get("default_branch")?,
        embedding_model: row.try_get("embedding_model")?,
        chunk_count: row.try_get("chunk_count")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn chunk_from_row(row: &PgRow) -> VectorDataResult<ScoredChunk> {
    let start_line: i32 = row.try_get("start_line")?;
    let end_line: i32 = row.try_get("end_line")?;
    let chunk_index: i32 = row.try_get("chunk_index")?;
    let vector_score: f64 = row.try_get("vector_score")?;
    Ok(ScoredChunk {
        chunk: Chunk {
            id: row.try_get("id")?,
            repo_id: row.try_get("repo_id")?,
            file_path: row.try_get("file_path")?,
            language: row.try_get("language")?,
            symbol_name: row.try_get("symbol_name")?,
            start_line: start_line.max(1) as usize,
            end_line: end_line.max(1) as usize,
            content: row.try_get("content")?,
            chunk_index: chunk_index.max(0) as usize,
            embedding: None,
        },
        vector_score: vector_score as f32,
    })
}

#[async_trait]
impl VectorStore for PgVectorStore {
    #[tracing::instrument(
        skip(self, chunks),
        fields(repo_id = %context.repo_id, commit = %context.commit_hash, chunk_count = chunks.len(), correlation_id = %correlation_id)
    )]
    async fn write(
        &self,
        chunks: &[Chunk],
        context: &WriteContext,
        correlation_id: &CorrelationId,
    ) -> VectorDataResult<WriteOutcome> {
        self.validate(chunks, context)?;

        match self.write_tx(chunks, context).await {
            Ok(outcome) => {
                tracing::info!(
                    strategy = %outcome.strategy,
                    chunks_written = outcome.chunks_written,
                    "vector write committed"
                );
                Ok(outcome)
            }
            Err(e) => {
                // Transaction already rolled back; the prior snapshot's
                // chunks are untouched, only the status flips
                self.mark_failed(&context.repo_id).await;
                Err(e)
            }
        }
    }

    async fn search(
        &self,
        query: &SearchQuery,
        _correlation_id: &CorrelationId,
    ) -> VectorDataResult<Vec<ScoredChunk>> {
        let rows = sqlx::query(
            r"
            SELECT id, repo_id, file_path, language, content, start_line, end_line,
                   symbol_name, chunk_index,
                   1 - (embedding <=> $2::vector) AS vector_score
            FROM code_chunks
            WHERE repo_id = $1
              AND ($3::text IS NULL OR file_path LIKE $3)
              AND 1 - (embedding <=> $2::vector) >= $4
            ORDER BY embedding <=> $2::vector
            LIMIT $5
            ",
        )
        .bind(&query.repo_id)
        .bind(vector_literal(&query.embedding))
        .bind(query.file_filter.as_deref())
        .bind(f64::from(query.min_score))
        .bind(query.limit as i64)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(chunk_from_row).collect()
    }

    async fn get_index(&self, repo_id: &str) -> VectorDataResult<Option<RepoIndexRecord>> {
        let row = sqlx::query("SELECT * FROM repo_index WHERE repo_id = $1")
            .bind(repo_id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(index_from_row).transpose()
    }
}

impl PgVectorStore {
    async fn write_tx(
        &self,
        chunks: &[Chunk],
        context: &WriteContext,
    ) -> VectorDataResult<WriteOutcome> {
        let mut tx = self.pool.begin().await?;

        // Serialize writers per repository for the transaction's lifetime
        sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1))")
            .bind(&context.repo_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("INSERT INTO repo_index (repo_id) VALUES ($1) ON CONFLICT (repo_id) DO NOTHING")
            .bind(&context.repo_id)
            .execute(&mut *tx)
            .await?;

        let prior = sqlx::query(
            "SELECT status, commit_hash, embedding_model FROM repo_index WHERE repo_id = $1",
        )
        .bind(&context.repo_id)
        .fetch_one(&mut *tx)
        .await?;

        let prior_status: String = prior.try_get("status")?;
        let prior_commit: Option<String> = prior.try_get("commit_hash")?;
        let prior_model: Option<String> = prior.try_get("embedding_model")?;

        // 1. Commit-hash dedup: same commit, same model, already served
        if prior_status == IndexStatus::Ready.as_str()
            && prior_commit.as_deref() == Some(context.commit_hash.as_str())
            && prior_model.as_deref() == Some(context.model.as_str())
        {
            tx.commit().await?;
            return Ok(WriteOutcome {
                strategy: WriteStrategy::Skipped,
                chunks_written: 0,
            });
        }

        // 2. Model change invalidates the whole space
        let strategy = if prior_model.is_some() && prior_model.as_deref() != Some(context.model.as_str())
        {
            WriteStrategy::FullReindex
        } else {
            WriteStrategy::Upsert
        };

        if strategy == WriteStrategy::FullReindex {
            sqlx::query("DELETE FROM code_chunks WHERE repo_id = $1")
                .bind(&context.repo_id)
                .execute(&mut *tx)
                .await?;
        }

        // New rows carry this timestamp; anything older is stale
        let write_instant = Utc::now();

        for batch in chunks.chunks(INSERT_BATCH_ROWS) {
            let mut builder: QueryBuilder<'_, Postgres> = QueryBuilder::new(
                "INSERT INTO code_chunks \
                 (id, repo_id, file_path, language, content, start_line, end_line, \
                  symbol_name, chunk_index, embedding, embedded_at) ",
            );
            builder.push_values(batch, |mut row, chunk| {
                let embedding = chunk.embedding.as_deref().unwrap_or_default();
                row.push_bind(chunk.id)
                    .push_bind(&chunk.repo_id)
                    .push_bind(&chunk.file_path)
                    .push_bind(chunk.language.as_deref())
                    .push_bind(&chunk.content)
                    .push_bind(chunk.start_line as i32)
                    .push_bind(chunk.end_line as i32)
                    .push_bind(chunk.symbol_name.as_deref())
                    .push_bind(chunk.chunk_index as i32)
                    .push_bind(vector_literal(embedding));
                row.push_unseparated("::vector").push_bind(write_instant);
            });
            // Refreshed rows keep their id so existing citations stay valid
            builder.push(
                " ON CONFLICT (repo_id, file_path, chunk_index) DO UPDATE SET \
                 language = EXCLUDED.language, content = EXCLUDED.content, \
                 start_line = EXCLUDED.start_line, end_line = EXCLUDED.end_line, \
                 symbol_name = EXCLUDED.symbol_name, embedding = EXCLUDED.embedding, \
                 embedded_at = EXCLUDED.embedded_at",
            );
            builder.build().execute(&mut *tx).await?;
        }

        // Upsert leftovers: rows for files or indexes no longer present
        sqlx::query("DELETE FROM code_chunks WHERE repo_id = $1 AND embedded_at < $2")
            .bind(&context.repo_id)
            .bind(write_instant)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            r"
            UPDATE repo_index
            SET status = 'ready', commit_hash = $2, default_branch = $3,
                embedding_model = $4, chunk_count = $5, updated_at = now()
            WHERE repo_id = $1
            ",
        )
        .bind(&context.repo_id)
        .bind(&context.commit_hash)
        .bind(&context.default_branch)
        .bind(&context.model)
        .bind(chunks.len() as i64)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(WriteOutcome {
            strategy,
            chunks_written: chunks.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vector_literal_is_bracketed_and_comma_separated() {
        assert_eq!(vector_literal(&[1.0, -0.5, 0.25]), "[1,-0.5,0.25]");
        assert_eq!(vector_literal(&[]), "[]");
    }
}
