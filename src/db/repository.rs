use std::collections::HashSet;
use std::path::Path;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, OptionalExtension, Row};
use tokio_rusqlite::Connection;

use crate::error::{AppError, Result};
use crate::models::{Article, Blog, NewArticle, NewBlog};

use super::schema::SCHEMA;

/// Upper bound on bound parameters per `IN (...)` lookup.
const URL_LOOKUP_CHUNK: usize = 500;

const BLOG_COLUMNS: &str = "id, name, url, feed_url, scrape_selector, last_scanned";
const ARTICLE_COLUMNS: &str =
    "id, blog_id, title, url, published_date, discovered_date, is_read";

pub struct Repository {
    conn: Connection,
}

impl Repository {
    pub async fn new(db_path: &str) -> Result<Self> {
        if let Some(parent) = Path::new(db_path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(db_path).await?;

        conn.call(|conn| {
            conn.execute_batch(SCHEMA)?;
            Ok(())
        })
        .await?;

        Ok(Self { conn })
    }

    // Blog operations

    /// Insert a blog and return it with its assigned id. A name or URL
    /// collision fails with [`AppError::DuplicateKey`].
    pub async fn insert_blog(&self, blog: NewBlog) -> Result<Blog> {
        let outcome = self
            .conn
            .call(move |conn| {
                let result = conn.execute(
                    "INSERT INTO blogs (name, url, feed_url, scrape_selector) VALUES (?1, ?2, ?3, ?4)",
                    params![blog.name, blog.url, blog.feed_url, blog.scrape_selector],
                );
                match result {
                    Ok(_) => Ok(Ok(Blog {
                        id: conn.last_insert_rowid(),
                        name: blog.name,
                        url: blog.url,
                        feed_url: blog.feed_url,
                        scrape_selector: blog.scrape_selector,
                        last_scanned: None,
                    })),
                    Err(e) => match unique_violation(&e) {
                        Some(column) => Ok(Err(column)),
                        None => Err(e.into()),
                    },
                }
            })
            .await?;

        outcome.map_err(AppError::DuplicateKey)
    }

    #[allow(dead_code)]
    pub async fn find_blog(&self, id: i64) -> Result<Option<Blog>> {
        self.query_blog("id = ?1", Value::Integer(id)).await
    }

    pub async fn find_blog_by_name(&self, name: &str) -> Result<Option<Blog>> {
        self.query_blog("name = ?1", Value::Text(name.to_string())).await
    }

    pub async fn find_blog_by_url(&self, url: &str) -> Result<Option<Blog>> {
        self.query_blog("url = ?1", Value::Text(url.to_string())).await
    }

    async fn query_blog(&self, condition: &'static str, value: Value) -> Result<Option<Blog>> {
        let blog = self
            .conn
            .call(move |conn| {
                let sql = format!("SELECT {} FROM blogs WHERE {}", BLOG_COLUMNS, condition);
                let blog = conn
                    .query_row(&sql, params![value], blog_from_row)
                    .optional()?;
                Ok(blog)
            })
            .await?;
        Ok(blog)
    }

    pub async fn list_blogs(&self) -> Result<Vec<Blog>> {
        let blogs = self
            .conn
            .call(|conn| {
                let sql = format!("SELECT {} FROM blogs ORDER BY name", BLOG_COLUMNS);
                let mut stmt = conn.prepare(&sql)?;
                let blogs = stmt
                    .query_map([], blog_from_row)?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(blogs)
            })
            .await?;
        Ok(blogs)
    }

    /// Full-record update keyed on the blog id.
    pub async fn update_blog(&self, blog: &Blog) -> Result<()> {
        let blog = blog.clone();
        let outcome = self
            .conn
            .call(move |conn| {
                let result = conn.execute(
                    r#"UPDATE blogs
                       SET name = ?1, url = ?2, feed_url = ?3, scrape_selector = ?4, last_scanned = ?5
                       WHERE id = ?6"#,
                    params![
                        blog.name,
                        blog.url,
                        blog.feed_url,
                        blog.scrape_selector,
                        blog.last_scanned.map(format_datetime),
                        blog.id,
                    ],
                );
                match result {
                    Ok(_) => Ok(Ok(())),
                    Err(e) => match unique_violation(&e) {
                        Some(column) => Ok(Err(column)),
                        None => Err(e.into()),
                    },
                }
            })
            .await?;

        outcome.map_err(AppError::DuplicateKey)
    }

    pub async fn update_blog_last_scanned(&self, id: i64, at: DateTime<Utc>) -> Result<()> {
        self.conn
            .call(move |conn| {
                conn.execute(
                    "UPDATE blogs SET last_scanned = ?1 WHERE id = ?2",
                    params![format_datetime(at), id],
                )?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    /// Delete a blog together with its articles. Returns false when no blog
    /// had that id.
    pub async fn remove_blog(&self, id: i64) -> Result<bool> {
        let removed = self
            .conn
            .call(move |conn| {
                let tx = conn.transaction()?;
                tx.execute("DELETE FROM articles WHERE blog_id = ?1", params![id])?;
                let removed = tx.execute("DELETE FROM blogs WHERE id = ?1", params![id])?;
                tx.commit()?;
                Ok(removed > 0)
            })
            .await?;
        Ok(removed)
    }

    // Article operations

    pub async fn find_article(&self, id: i64) -> Result<Option<Article>> {
        let article = self
            .conn
            .call(move |conn| {
                let sql = format!("SELECT {} FROM articles WHERE id = ?1", ARTICLE_COLUMNS);
                let article = conn
                    .query_row(&sql, params![id], article_from_row)
                    .optional()?;
                Ok(article)
            })
            .await?;
        Ok(article)
    }

    /// Articles newest-discovered first, optionally restricted to unread
    /// ones and to a single blog.
    pub async fn list_articles(&self, unread_only: bool, blog_id: Option<i64>) -> Result<Vec<Article>> {
        let articles = self
            .conn
            .call(move |conn| {
                let sql = format!(
                    r#"SELECT {} FROM articles
                       WHERE (?1 = 0 OR is_read = 0)
                         AND (?2 IS NULL OR blog_id = ?2)
                       ORDER BY discovered_date DESC, id DESC"#,
                    ARTICLE_COLUMNS
                );
                let mut stmt = conn.prepare(&sql)?;
                let articles = stmt
                    .query_map(params![unread_only, blog_id], article_from_row)?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(articles)
            })
            .await?;
        Ok(articles)
    }

    /// The subset of `urls` already stored as articles, across all blogs.
    pub async fn existing_urls(&self, urls: Vec<String>) -> Result<HashSet<String>> {
        if urls.is_empty() {
            return Ok(HashSet::new());
        }

        let existing = self
            .conn
            .call(move |conn| {
                let mut found = HashSet::new();
                for chunk in urls.chunks(URL_LOOKUP_CHUNK) {
                    let placeholders = vec!["?"; chunk.len()].join(", ");
                    let sql = format!("SELECT url FROM articles WHERE url IN ({})", placeholders);
                    let mut stmt = conn.prepare(&sql)?;
                    let rows = stmt.query_map(params_from_iter(chunk.iter()), |row| {
                        row.get::<_, String>(0)
                    })?;
                    for url in rows {
                        found.insert(url?);
                    }
                }
                Ok(found)
            })
            .await?;
        Ok(existing)
    }

    /// Insert articles in one transaction. URLs that are already stored are
    /// skipped, so the returned count is the number of rows actually added.
    pub async fn bulk_insert_articles(&self, articles: Vec<NewArticle>) -> Result<usize> {
        if articles.is_empty() {
            return Ok(0);
        }

        let inserted = self
            .conn
            .call(move |conn| {
                let tx = conn.transaction()?;
                let mut inserted = 0;
                {
                    let mut stmt = tx.prepare(
                        r#"INSERT OR IGNORE INTO articles (blog_id, title, url, published_date, discovered_date, is_read)
                           VALUES (?1, ?2, ?3, ?4, ?5, 0)"#,
                    )?;
                    for article in &articles {
                        inserted += stmt.execute(params![
                            article.blog_id,
                            article.title,
                            article.url,
                            article.published_at.map(format_datetime),
                            format_datetime(article.discovered_at),
                        ])?;
                    }
                }
                tx.commit()?;
                Ok(inserted)
            })
            .await?;
        Ok(inserted)
    }

    /// Returns false when no article had that id.
    pub async fn set_article_read(&self, id: i64, is_read: bool) -> Result<bool> {
        let updated = self
            .conn
            .call(move |conn| {
                let updated = conn.execute(
                    "UPDATE articles SET is_read = ?1 WHERE id = ?2",
                    params![is_read, id],
                )?;
                Ok(updated > 0)
            })
            .await?;
        Ok(updated)
    }
}

/// Column reported by a UNIQUE constraint failure, e.g. `blogs.name`.
fn unique_violation(err: &rusqlite::Error) -> Option<String> {
    match err {
        rusqlite::Error::SqliteFailure(e, msg)
            if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE =>
        {
            let column = msg
                .as_deref()
                .and_then(|m| m.rsplit(": ").next())
                .unwrap_or("unknown");
            Some(column.to_string())
        }
        _ => None,
    }
}

fn format_datetime(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    // Try RFC3339 first (e.g., "2026-01-11T12:34:56.000000Z")
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    // Try SQLite datetime format (e.g., "2026-01-11 12:34:56")
    if let Ok(naive) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Some(naive.and_utc());
    }
    None
}

fn blog_from_row(row: &Row) -> rusqlite::Result<Blog> {
    Ok(Blog {
        id: row.get(0)?,
        name: row.get(1)?,
        url: row.get(2)?,
        feed_url: row.get(3)?,
        scrape_selector: row.get(4)?,
        last_scanned: row
            .get::<_, Option<String>>(5)?
            .and_then(|s| parse_datetime(&s)),
    })
}

fn article_from_row(row: &Row) -> rusqlite::Result<Article> {
    Ok(Article {
        id: row.get(0)?,
        blog_id: row.get(1)?,
        title: row.get(2)?,
        url: row.get(3)?,
        published_at: row
            .get::<_, Option<String>>(4)?
            .and_then(|s| parse_datetime(&s)),
        discovered_at: row
            .get::<_, String>(5)
            .ok()
            .and_then(|s| parse_datetime(&s))
            .unwrap_or_else(Utc::now),
        is_read: row.get::<_, i64>(6)? != 0,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use tempfile::TempDir;

    async fn repository() -> (TempDir, Repository) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("blogwatcher.db");
        let repo = Repository::new(path.to_str().unwrap()).await.unwrap();
        (dir, repo)
    }

    fn new_article(blog_id: i64, url: &str, discovered_at: DateTime<Utc>) -> NewArticle {
        NewArticle {
            blog_id,
            title: format!("Title for {}", url),
            url: url.to_string(),
            published_at: None,
            discovered_at,
        }
    }

    #[tokio::test]
    async fn creates_database_file_and_round_trips_blogs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("blogwatcher.db");
        let repo = Repository::new(path.to_str().unwrap()).await.unwrap();
        assert!(path.exists());

        let blog = repo
            .insert_blog(
                NewBlog::new("Test", "https://example.com")
                    .with_scrape_selector(Some("article a".into())),
            )
            .await
            .unwrap();
        assert!(blog.id > 0);

        let fetched = repo.find_blog_by_name("Test").await.unwrap().unwrap();
        assert_eq!(fetched, blog);
        assert_eq!(repo.find_blog(blog.id).await.unwrap(), Some(blog.clone()));
        assert_eq!(
            repo.find_blog_by_url("https://example.com").await.unwrap(),
            Some(blog)
        );
        assert!(repo.find_blog_by_name("Missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn duplicate_name_or_url_is_a_duplicate_key() {
        let (_dir, repo) = repository().await;
        repo.insert_blog(NewBlog::new("A", "https://a.example"))
            .await
            .unwrap();

        let err = repo
            .insert_blog(NewBlog::new("A", "https://other.example"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::DuplicateKey(ref c) if c == "blogs.name"));

        let err = repo
            .insert_blog(NewBlog::new("B", "https://a.example"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::DuplicateKey(ref c) if c == "blogs.url"));
    }

    #[tokio::test]
    async fn lists_blogs_by_name_and_updates_full_record() {
        let (_dir, repo) = repository().await;
        repo.insert_blog(NewBlog::new("Zeta", "https://z.example"))
            .await
            .unwrap();
        let mut alpha = repo
            .insert_blog(NewBlog::new("Alpha", "https://a.example"))
            .await
            .unwrap();

        let names: Vec<String> = repo
            .list_blogs()
            .await
            .unwrap()
            .into_iter()
            .map(|b| b.name)
            .collect();
        assert_eq!(names, vec!["Alpha", "Zeta"]);

        alpha.feed_url = Some("https://a.example/feed".into());
        repo.update_blog(&alpha).await.unwrap();
        let scanned_at = Utc::now();
        repo.update_blog_last_scanned(alpha.id, scanned_at)
            .await
            .unwrap();

        let stored = repo.find_blog(alpha.id).await.unwrap().unwrap();
        assert_eq!(stored.feed_url.as_deref(), Some("https://a.example/feed"));
        assert_eq!(
            stored.last_scanned.map(|t| t.timestamp_micros()),
            Some(scanned_at.timestamp_micros())
        );
    }

    #[tokio::test]
    async fn bulk_insert_counts_only_new_urls() {
        let (_dir, repo) = repository().await;
        let blog = repo
            .insert_blog(NewBlog::new("A", "https://a.example"))
            .await
            .unwrap();
        let now = Utc::now();

        let inserted = repo
            .bulk_insert_articles(vec![
                new_article(blog.id, "https://a.example/1", now),
                new_article(blog.id, "https://a.example/2", now),
            ])
            .await
            .unwrap();
        assert_eq!(inserted, 2);

        let inserted = repo
            .bulk_insert_articles(vec![
                new_article(blog.id, "https://a.example/2", now),
                new_article(blog.id, "https://a.example/3", now),
            ])
            .await
            .unwrap();
        assert_eq!(inserted, 1);
        assert_eq!(repo.bulk_insert_articles(vec![]).await.unwrap(), 0);

        let existing = repo
            .existing_urls(vec![
                "https://a.example/1".into(),
                "https://a.example/3".into(),
                "https://a.example/404".into(),
            ])
            .await
            .unwrap();
        assert_eq!(existing.len(), 2);
        assert!(existing.contains("https://a.example/1"));
        assert!(!existing.contains("https://a.example/404"));
    }

    #[tokio::test]
    async fn existing_urls_handles_lookups_larger_than_one_chunk() {
        let (_dir, repo) = repository().await;
        let blog = repo
            .insert_blog(NewBlog::new("A", "https://a.example"))
            .await
            .unwrap();
        let now = Utc::now();
        let urls: Vec<String> = (0..1200)
            .map(|i| format!("https://a.example/{}", i))
            .collect();

        repo.bulk_insert_articles(
            urls.iter()
                .step_by(2)
                .map(|u| new_article(blog.id, u, now))
                .collect(),
        )
        .await
        .unwrap();

        let existing = repo.existing_urls(urls).await.unwrap();
        assert_eq!(existing.len(), 600);
    }

    #[tokio::test]
    async fn lists_articles_newest_first_with_filters() {
        let (_dir, repo) = repository().await;
        let a = repo
            .insert_blog(NewBlog::new("A", "https://a.example"))
            .await
            .unwrap();
        let b = repo
            .insert_blog(NewBlog::new("B", "https://b.example"))
            .await
            .unwrap();
        let earlier = Utc::now() - Duration::hours(1);
        let later = Utc::now();

        repo.bulk_insert_articles(vec![
            new_article(a.id, "https://a.example/old", earlier),
            new_article(a.id, "https://a.example/new", later),
            new_article(b.id, "https://b.example/new", later),
        ])
        .await
        .unwrap();

        let all = repo.list_articles(false, None).await.unwrap();
        let urls: Vec<&str> = all.iter().map(|a| a.url.as_str()).collect();
        assert_eq!(
            urls,
            vec![
                "https://b.example/new",
                "https://a.example/new",
                "https://a.example/old"
            ]
        );
        assert!(all.iter().all(|a| !a.is_read));

        let old = all.iter().find(|a| a.url.ends_with("/old")).unwrap();
        assert!(repo.set_article_read(old.id, true).await.unwrap());
        assert!(!repo.set_article_read(9999, true).await.unwrap());

        let unread = repo.list_articles(true, Some(a.id)).await.unwrap();
        assert_eq!(unread.len(), 1);
        assert_eq!(unread[0].url, "https://a.example/new");

        let stored = repo.find_article(old.id).await.unwrap().unwrap();
        assert!(stored.is_read);
        assert_eq!(
            stored.discovered_at.timestamp_micros(),
            earlier.timestamp_micros()
        );
    }

    #[tokio::test]
    async fn removing_a_blog_removes_its_articles() {
        let (_dir, repo) = repository().await;
        let blog = repo
            .insert_blog(NewBlog::new("A", "https://a.example"))
            .await
            .unwrap();
        repo.bulk_insert_articles(vec![new_article(blog.id, "https://a.example/1", Utc::now())])
            .await
            .unwrap();

        assert!(repo.remove_blog(blog.id).await.unwrap());
        assert!(!repo.remove_blog(blog.id).await.unwrap());
        assert!(repo.list_articles(false, None).await.unwrap().is_empty());
        assert!(repo.find_blog(blog.id).await.unwrap().is_none());
    }

    #[test]
    fn parses_both_stored_datetime_formats() {
        assert!(parse_datetime("2026-01-11T12:34:56.000000Z").is_some());
        assert!(parse_datetime("2026-01-11 12:34:56").is_some());
        assert!(parse_datetime("yesterday").is_none());
    }
}
