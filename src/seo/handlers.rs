use std::fmt::Write as _;

use axum::extract::State;
use axum::http::header;
use axum::response::IntoResponse;
use time::OffsetDateTime;
use tracing::instrument;
use uuid::Uuid;

use crate::auth::repo::Role;
use crate::error::ApiError;
use crate::rfps::repo::RfpStatus;
use crate::state::AppState;

/// Url-friendly slug: lowercased, non-alphanumeric runs collapsed to single
/// dashes, capped at 50 chars, with the id prefix appended for uniqueness.
pub fn slugify(title: &str, id: Uuid) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut last_dash = true;
    for c in title.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
            last_dash = false;
        } else if !last_dash {
            slug.push('-');
            last_dash = true;
        }
        if slug.len() >= 50 {
            break;
        }
    }
    let slug = slug.trim_matches('-');
    let id = id.simple().to_string();
    format!("{slug}-{}", &id[..8])
}

struct SitemapEntry {
    path: String,
    changefreq: &'static str,
    priority: &'static str,
    lastmod: Option<OffsetDateTime>,
}

fn render_sitemap(base_url: &str, entries: &[SitemapEntry]) -> String {
    let mut xml = String::from(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
"#,
    );
    for entry in entries {
        let _ = write!(xml, "  <url>\n    <loc>{base_url}{}</loc>\n", entry.path);
        if let Some(lastmod) = entry.lastmod {
            let _ = write!(xml, "    <lastmod>{}</lastmod>\n", lastmod.date());
        }
        let _ = write!(
            xml,
            "    <changefreq>{}</changefreq>\n    <priority>{}</priority>\n  </url>\n",
            entry.changefreq, entry.priority
        );
    }
    xml.push_str("</urlset>\n");
    xml
}

fn static_entries() -> Vec<SitemapEntry> {
    [
        ("/", "daily", "1.0"),
        ("/pricing", "monthly", "0.8"),
        ("/about", "monthly", "0.7"),
        ("/library", "weekly", "0.9"),
        ("/blog", "daily", "0.9"),
    ]
    .into_iter()
    .map(|(path, changefreq, priority)| SitemapEntry {
        path: path.to_string(),
        changefreq,
        priority,
        lastmod: None,
    })
    .collect()
}

#[instrument(skip(state))]
pub async fn sitemap(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let mut entries = static_entries();

    #[derive(sqlx::FromRow)]
    struct Row {
        id: Uuid,
        label: String,
        updated_at: OffsetDateTime,
    }

    let projects = sqlx::query_as::<_, Row>(
        r#"
        SELECT id, title AS label, updated_at FROM rfps
        WHERE status = $1 ORDER BY updated_at DESC LIMIT 1000
        "#,
    )
    .bind(RfpStatus::Open)
    .fetch_all(&state.db)
    .await?;
    for p in projects {
        entries.push(SitemapEntry {
            path: format!("/projects/{}", slugify(&p.label, p.id)),
            changefreq: "weekly",
            priority: "0.8",
            lastmod: Some(p.updated_at),
        });
    }

    let professionals = sqlx::query_as::<_, Row>(
        r#"
        SELECT id, name AS label, updated_at FROM users
        WHERE role = $1 AND is_active LIMIT 500
        "#,
    )
    .bind(Role::Professional)
    .fetch_all(&state.db)
    .await?;
    for prof in professionals {
        entries.push(SitemapEntry {
            path: format!("/architects/{}", slugify(&prof.label, prof.id)),
            changefreq: "weekly",
            priority: "0.7",
            lastmod: Some(prof.updated_at),
        });
    }

    let xml = render_sitemap(&state.config.frontend_url, &entries);
    Ok(([(header::CONTENT_TYPE, "application/xml")], xml))
}

#[instrument(skip(state))]
pub async fn robots(State(state): State<AppState>) -> impl IntoResponse {
    let body = format!(
        "User-agent: *\nAllow: /\nDisallow: /admin\nDisallow: /dashboard\nDisallow: /api/\n\nSitemap: {}/sitemap.xml\n",
        state.config.frontend_url
    );
    ([(header::CONTENT_TYPE, "text/plain")], body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn slugify_collapses_and_lowercases() {
        let id = Uuid::nil();
        let slug = slugify("Modern Loft -- Renovation!", id);
        assert_eq!(slug, "modern-loft-renovation-00000000");
    }

    #[test]
    fn slugify_caps_length() {
        let id = Uuid::nil();
        let slug = slugify(&"very long title ".repeat(20), id);
        // 50-char slug body plus dash plus 8-char id prefix.
        assert!(slug.len() <= 50 + 1 + 8);
    }

    #[test]
    fn sitemap_contains_entries_and_lastmod() {
        let entries = vec![
            SitemapEntry {
                path: "/".into(),
                changefreq: "daily",
                priority: "1.0",
                lastmod: None,
            },
            SitemapEntry {
                path: "/projects/loft-00000000".into(),
                changefreq: "weekly",
                priority: "0.8",
                lastmod: Some(datetime!(2026-08-01 12:00:00 UTC)),
            },
        ];
        let xml = render_sitemap("https://example.com", &entries);
        assert!(xml.starts_with("<?xml"));
        assert!(xml.contains("<loc>https://example.com/</loc>"));
        assert!(xml.contains("<loc>https://example.com/projects/loft-00000000</loc>"));
        assert!(xml.contains("<lastmod>2026-08-01</lastmod>"));
        assert!(xml.trim_end().ends_with("</urlset>"));
    }
}
