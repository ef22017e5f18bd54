use std::collections::HashMap;
use std::sync::Arc;

use url::Url;

use crate::db::Repository;
use crate::error::{AppError, BlogField, Result};
use crate::models::{Article, Blog, NewBlog};

/// Single-entity operations on blogs and articles. Unlike scans, lookup
/// failures here are returned as typed errors.
pub struct BlogService {
    repository: Arc<Repository>,
}

impl BlogService {
    pub fn new(repository: Arc<Repository>) -> Self {
        Self { repository }
    }

    pub async fn add_blog(&self, blog: NewBlog) -> Result<Blog> {
        validate_url(&blog.url)?;
        if let Some(feed_url) = &blog.feed_url {
            validate_url(feed_url)?;
        }

        if self.repository.find_blog_by_name(&blog.name).await?.is_some() {
            return Err(AppError::BlogAlreadyExists {
                field: BlogField::Name,
                value: blog.name,
            });
        }

        if self.repository.find_blog_by_url(&blog.url).await?.is_some() {
            return Err(AppError::BlogAlreadyExists {
                field: BlogField::Url,
                value: blog.url,
            });
        }

        let name = blog.name.clone();
        let url = blog.url.clone();
        match self.repository.insert_blog(blog).await {
            Err(AppError::DuplicateKey(column)) if column.ends_with("name") => {
                Err(AppError::BlogAlreadyExists {
                    field: BlogField::Name,
                    value: name,
                })
            }
            Err(AppError::DuplicateKey(_)) => Err(AppError::BlogAlreadyExists {
                field: BlogField::Url,
                value: url,
            }),
            other => other,
        }
    }

    pub async fn remove_blog(&self, name: &str) -> Result<()> {
        let blog = self.blog_by_name(name).await?;
        self.repository.remove_blog(blog.id).await?;
        Ok(())
    }

    pub async fn list_blogs(&self) -> Result<Vec<Blog>> {
        self.repository.list_blogs().await
    }

    /// Articles (unread only unless `show_all`), optionally for one blog,
    /// together with a blog id to name map for display.
    pub async fn get_articles(
        &self,
        show_all: bool,
        blog_name: Option<&str>,
    ) -> Result<(Vec<Article>, HashMap<i64, String>)> {
        let blog_id = match blog_name {
            Some(name) => Some(self.blog_by_name(name).await?.id),
            None => None,
        };

        let articles = self.repository.list_articles(!show_all, blog_id).await?;
        let blog_names = self
            .repository
            .list_blogs()
            .await?
            .into_iter()
            .map(|b| (b.id, b.name))
            .collect();

        Ok((articles, blog_names))
    }

    /// Mark an article read. Returns the article as it was before the call,
    /// so callers can tell whether it was already read.
    pub async fn mark_article_read(&self, id: i64) -> Result<Article> {
        self.set_read(id, true).await
    }

    /// Mark an article unread. Returns the article as it was before the call.
    pub async fn mark_article_unread(&self, id: i64) -> Result<Article> {
        self.set_read(id, false).await
    }

    /// Mark every unread article (optionally of one blog) read and return
    /// the ones that changed.
    pub async fn mark_all_articles_read(&self, blog_name: Option<&str>) -> Result<Vec<Article>> {
        let (articles, _) = self.get_articles(false, blog_name).await?;

        for article in &articles {
            self.repository.set_article_read(article.id, true).await?;
        }

        Ok(articles)
    }

    async fn set_read(&self, id: i64, is_read: bool) -> Result<Article> {
        let article = self
            .repository
            .find_article(id)
            .await?
            .ok_or(AppError::ArticleNotFound(id))?;

        if article.is_read != is_read {
            self.repository.set_article_read(id, is_read).await?;
        }

        Ok(article)
    }

    async fn blog_by_name(&self, name: &str) -> Result<Blog> {
        self.repository
            .find_blog_by_name(name)
            .await?
            .ok_or_else(|| AppError::BlogNotFound(name.to_string()))
    }
}

fn validate_url(url: &str) -> Result<()> {
    match Url::parse(url) {
        Ok(parsed) if parsed.has_host() => Ok(()),
        _ => Err(AppError::InvalidUrl(url.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use tempfile::TempDir;

    use super::*;
    use crate::models::NewArticle;

    async fn service() -> (TempDir, Arc<Repository>, BlogService) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("blogwatcher.db");
        let repo = Arc::new(Repository::new(path.to_str().unwrap()).await.unwrap());
        let service = BlogService::new(Arc::clone(&repo));
        (dir, repo, service)
    }

    async fn seed_articles(repo: &Repository, blog: &Blog, urls: &[&str]) {
        let now = Utc::now();
        let articles = urls
            .iter()
            .map(|u| NewArticle {
                blog_id: blog.id,
                title: u.to_string(),
                url: u.to_string(),
                published_at: None,
                discovered_at: now,
            })
            .collect();
        repo.bulk_insert_articles(articles).await.unwrap();
    }

    #[tokio::test]
    async fn add_blog_stores_optional_fields() {
        let (_dir, _repo, service) = service().await;

        let blog = service
            .add_blog(
                NewBlog::new("Blog", "https://blog.example")
                    .with_feed_url(Some("https://blog.example/feed".into()))
                    .with_scrape_selector(Some("article a".into())),
            )
            .await
            .unwrap();

        assert!(blog.id > 0);
        assert_eq!(blog.feed_url.as_deref(), Some("https://blog.example/feed"));
        assert_eq!(blog.scrape_selector.as_deref(), Some("article a"));
    }

    #[tokio::test]
    async fn add_blog_rejects_duplicate_name_then_url() {
        let (_dir, _repo, service) = service().await;
        service
            .add_blog(NewBlog::new("Blog", "https://blog.example"))
            .await
            .unwrap();

        let err = service
            .add_blog(NewBlog::new("Blog", "https://other.example"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AppError::BlogAlreadyExists { field: BlogField::Name, .. }
        ));
        assert_eq!(err.to_string(), "Blog with name 'Blog' already exists");

        let err = service
            .add_blog(NewBlog::new("Other", "https://blog.example"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AppError::BlogAlreadyExists { field: BlogField::Url, .. }
        ));
    }

    #[tokio::test]
    async fn add_blog_rejects_relative_urls() {
        let (_dir, _repo, service) = service().await;

        let err = service
            .add_blog(NewBlog::new("Blog", "blog.example"))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::InvalidUrl(_)));
    }

    #[tokio::test]
    async fn remove_blog_by_name() {
        let (_dir, repo, service) = service().await;
        let blog = service
            .add_blog(NewBlog::new("Blog", "https://blog.example"))
            .await
            .unwrap();
        seed_articles(&repo, &blog, &["https://blog.example/1"]).await;

        service.remove_blog("Blog").await.unwrap();

        assert!(service.list_blogs().await.unwrap().is_empty());
        assert!(repo.list_articles(false, None).await.unwrap().is_empty());
        assert!(matches!(
            service.remove_blog("Blog").await.unwrap_err(),
            AppError::BlogNotFound(_)
        ));
    }

    #[tokio::test]
    async fn get_articles_filters_and_maps_blog_names() {
        let (_dir, repo, service) = service().await;
        let a = service
            .add_blog(NewBlog::new("A", "https://a.example"))
            .await
            .unwrap();
        let b = service
            .add_blog(NewBlog::new("B", "https://b.example"))
            .await
            .unwrap();
        seed_articles(&repo, &a, &["https://a.example/1", "https://a.example/2"]).await;
        seed_articles(&repo, &b, &["https://b.example/1"]).await;

        let (unread, names) = service.get_articles(false, None).await.unwrap();
        assert_eq!(unread.len(), 3);
        assert_eq!(names.get(&b.id).map(String::as_str), Some("B"));

        service.mark_article_read(unread[0].id).await.unwrap();
        let (unread, _) = service.get_articles(false, None).await.unwrap();
        assert_eq!(unread.len(), 2);
        let (all, _) = service.get_articles(true, None).await.unwrap();
        assert_eq!(all.len(), 3);

        let (only_a, _) = service.get_articles(true, Some("A")).await.unwrap();
        assert!(only_a.iter().all(|art| art.blog_id == a.id));
        assert_eq!(only_a.len(), 2);

        assert!(matches!(
            service.get_articles(true, Some("Missing")).await.unwrap_err(),
            AppError::BlogNotFound(_)
        ));
    }

    #[tokio::test]
    async fn marking_read_twice_is_a_successful_no_op() {
        let (_dir, repo, service) = service().await;
        let blog = service
            .add_blog(NewBlog::new("Blog", "https://blog.example"))
            .await
            .unwrap();
        seed_articles(&repo, &blog, &["https://blog.example/1"]).await;
        let id = repo.list_articles(false, None).await.unwrap()[0].id;

        let before = service.mark_article_read(id).await.unwrap();
        assert!(!before.is_read);

        let before = service.mark_article_read(id).await.unwrap();
        assert!(before.is_read);
        assert!(repo.find_article(id).await.unwrap().unwrap().is_read);

        let before = service.mark_article_unread(id).await.unwrap();
        assert!(before.is_read);
        assert!(!repo.find_article(id).await.unwrap().unwrap().is_read);
    }

    #[tokio::test]
    async fn marking_unknown_article_is_not_found() {
        let (_dir, _repo, service) = service().await;

        assert!(matches!(
            service.mark_article_read(42).await.unwrap_err(),
            AppError::ArticleNotFound(42)
        ));
        assert!(matches!(
            service.mark_article_unread(42).await.unwrap_err(),
            AppError::ArticleNotFound(42)
        ));
    }

    #[tokio::test]
    async fn mark_all_read_scopes_to_blog() {
        let (_dir, repo, service) = service().await;
        let a = service
            .add_blog(NewBlog::new("A", "https://a.example"))
            .await
            .unwrap();
        let b = service
            .add_blog(NewBlog::new("B", "https://b.example"))
            .await
            .unwrap();
        seed_articles(&repo, &a, &["https://a.example/1", "https://a.example/2"]).await;
        seed_articles(&repo, &b, &["https://b.example/1"]).await;

        let marked = service.mark_all_articles_read(Some("A")).await.unwrap();
        assert_eq!(marked.len(), 2);

        let (unread, _) = service.get_articles(false, None).await.unwrap();
        assert_eq!(unread.len(), 1);
        assert_eq!(unread[0].blog_id, b.id);

        let marked = service.mark_all_articles_read(None).await.unwrap();
        assert_eq!(marked.len(), 1);
        assert!(service.mark_all_articles_read(None).await.unwrap().is_empty());
    }
}
