use std::io::{self, BufRead, Write};
use std::sync::Arc;

use crate::cli::Command;
use crate::config::Config;
use crate::db::Repository;
use crate::error::{AppError, Result};
use crate::feed::FeedFetcher;
use crate::models::{Article, Blog, NewBlog, ScanResult, ScanSource};
use crate::scrape::PageScraper;
use crate::services::{BlogService, Scanner};

pub struct App {
    blogs: BlogService,
    scanner: Scanner,
}

impl App {
    pub async fn new(config: &Config) -> Result<Self> {
        let repository = Arc::new(Repository::new(&config.db_path).await?);
        let client = config.http_client()?;

        let feeds = Arc::new(FeedFetcher::new(client.clone(), config.probe_timeout()));
        let scraper = Arc::new(PageScraper::new(client));

        Ok(Self {
            blogs: BlogService::new(Arc::clone(&repository)),
            scanner: Scanner::new(repository, feeds, scraper),
        })
    }

    pub async fn run(&self, command: Command) -> Result<()> {
        match command {
            Command::Add {
                name,
                url,
                feed_url,
                scrape_selector,
            } => {
                let blog = NewBlog::new(name, url)
                    .with_feed_url(feed_url)
                    .with_scrape_selector(scrape_selector);
                let blog = self.blogs.add_blog(blog).await?;
                println!("Added blog '{}'", blog.name);
            }

            Command::Remove { name, yes } => {
                if !yes && !confirm(&format!("Remove blog '{}' and all its articles?", name))? {
                    println!("Aborted.");
                    return Ok(());
                }
                self.blogs.remove_blog(&name).await?;
                println!("Removed blog '{}'", name);
            }

            Command::Blogs => self.list_blogs().await?,

            Command::Scan { name, json } => self.scan(name.as_deref(), json).await?,

            Command::Articles { all, blog } => self.list_articles(all, blog.as_deref()).await?,

            Command::Read { id } => {
                let before = self.blogs.mark_article_read(id).await?;
                if before.is_read {
                    println!("Article {} is already marked as read.", id);
                } else {
                    println!("Marked article {} as read", id);
                }
            }

            Command::Unread { id } => {
                let before = self.blogs.mark_article_unread(id).await?;
                if before.is_read {
                    println!("Marked article {} as unread", id);
                } else {
                    println!("Article {} is already marked as unread.", id);
                }
            }

            Command::ReadAll { blog, yes } => self.read_all(blog.as_deref(), yes).await?,
        }

        Ok(())
    }

    async fn list_blogs(&self) -> Result<()> {
        let blogs = self.blogs.list_blogs().await?;
        if blogs.is_empty() {
            println!("No blogs tracked yet. Use 'blogwatcher add' to add one.");
            return Ok(());
        }

        println!("Tracked blogs ({}):", blogs.len());
        println!();
        for blog in &blogs {
            println!("{}", format_blog(blog));
        }
        Ok(())
    }

    async fn scan(&self, name: Option<&str>, json: bool) -> Result<()> {
        let results = match name {
            Some(name) => {
                let result = self
                    .scanner
                    .scan_blog_by_name(name)
                    .await?
                    .ok_or_else(|| AppError::BlogNotFound(name.to_string()))?;
                vec![result]
            }
            None => {
                let results = self.scanner.scan_all_blogs().await?;
                if results.is_empty() && !json {
                    println!("No blogs tracked yet. Use 'blogwatcher add' to add one.");
                    return Ok(());
                }
                results
            }
        };

        if json {
            for result in &results {
                println!("{}", serde_json::to_string(result)?);
            }
            return Ok(());
        }

        for result in &results {
            println!("{}", format_scan_result(result));
        }

        if name.is_none() {
            let total_new: usize = results.iter().map(|r| r.new_articles).sum();
            println!();
            if total_new > 0 {
                println!("Found {} new article(s) total!", total_new);
            } else {
                println!("No new articles found.");
            }
        }
        Ok(())
    }

    async fn list_articles(&self, show_all: bool, blog_name: Option<&str>) -> Result<()> {
        let (articles, blog_names) = self.blogs.get_articles(show_all, blog_name).await?;

        if articles.is_empty() {
            if show_all {
                println!("No articles found.");
            } else {
                println!("No unread articles!");
            }
            return Ok(());
        }

        let label = if show_all { "All articles" } else { "Unread articles" };
        println!("{} ({}):", label, articles.len());
        println!();
        for article in &articles {
            let blog_name = blog_names
                .get(&article.blog_id)
                .map(String::as_str)
                .unwrap_or("Unknown");
            println!("{}", format_article(article, blog_name));
        }
        Ok(())
    }

    async fn read_all(&self, blog_name: Option<&str>, yes: bool) -> Result<()> {
        let (unread, _) = self.blogs.get_articles(false, blog_name).await?;
        if unread.is_empty() {
            println!("No unread articles to mark as read.");
            return Ok(());
        }

        if !yes {
            let scope = match blog_name {
                Some(name) => format!("from '{}'", name),
                None => "from all blogs".to_string(),
            };
            if !confirm(&format!("Mark {} article(s) {} as read?", unread.len(), scope))? {
                println!("Aborted.");
                return Ok(());
            }
        }

        let marked = self.blogs.mark_all_articles_read(blog_name).await?;
        println!("Marked {} article(s) as read", marked.len());
        Ok(())
    }
}

fn confirm(prompt: &str) -> Result<bool> {
    print!("{} [y/N]: ", prompt);
    io::stdout().flush()?;

    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
}

fn format_blog(blog: &Blog) -> String {
    let mut lines = vec![format!("  {}", blog.name), format!("    URL: {}", blog.url)];
    if let Some(feed_url) = &blog.feed_url {
        lines.push(format!("    Feed: {}", feed_url));
    }
    if let Some(selector) = &blog.scrape_selector {
        lines.push(format!("    Selector: {}", selector));
    }
    if let Some(last_scanned) = blog.last_scanned {
        lines.push(format!(
            "    Last scanned: {}",
            last_scanned.with_timezone(&chrono::Local).format("%Y-%m-%d %H:%M")
        ));
    }
    lines.push(String::new());
    lines.join("\n")
}

fn format_scan_result(result: &ScanResult) -> String {
    let detail = match (&result.error, result.source) {
        (Some(error), _) => format!("Error: {}", error),
        (None, ScanSource::None) => "No feed or scraper configured".to_string(),
        (None, source) => {
            let label = if source == ScanSource::Rss { "RSS" } else { "HTML" };
            format!(
                "Source: {} | Found: {} | New: {}",
                label, result.total_found, result.new_articles
            )
        }
    };
    format!("  {}\n    {}", result.blog_name, detail)
}

fn format_article(article: &Article, blog_name: &str) -> String {
    let status = if article.is_read { "[read]" } else { "[new]" };
    let mut lines = vec![
        format!("  [{}] {} {}", article.id, status, article.title),
        format!("       Blog: {}", blog_name),
        format!("       URL: {}", article.url),
    ];
    if let Some(published) = article.published_at {
        lines.push(format!("       Published: {}", published.format("%Y-%m-%d")));
    }
    lines.push(String::new());
    lines.join("\n")
}
