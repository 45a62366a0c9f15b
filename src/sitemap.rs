use chrono::NaiveDate;
use quick_xml::escape::escape;

use crate::catalog;

/// Pages outside the tool catalog
pub const STATIC_PAGES: [&str; 5] = ["/", "/about", "/privacy", "/terms", "/contact"];

#[derive(Debug, Clone, PartialEq)]
pub struct SitemapEntry {
    pub path: String,
    pub priority: f32,
    pub changefreq: &'static str,
}

/// Home first, then the other static pages, then every tool route
pub fn entries() -> Vec<SitemapEntry> {
    let statics = STATIC_PAGES.iter().map(|path| {
        let home = *path == "/";
        SitemapEntry {
            path: path.to_string(),
            priority: if home { 1.0 } else { 0.7 },
            changefreq: if home { "weekly" } else { "monthly" },
        }
    });
    let tools = catalog::all().iter().map(|tool| SitemapEntry {
        path: tool.route.to_string(),
        priority: 0.8,
        changefreq: "weekly",
    });
    statics.chain(tools).collect()
}

/// Render the `urlset` document for `base_url` (no trailing slash needed)
pub fn build_sitemap(base_url: &str, lastmod: NaiveDate) -> String {
    let base = base_url.trim_end_matches('/');
    let lastmod = lastmod.format("%Y-%m-%d");

    let mut xml = String::from(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
         <urlset xmlns=\"http://www.sitemaps.org/schemas/sitemap/0.9\">\n",
    );
    for entry in entries() {
        let loc = format!("{base}{}", entry.path);
        xml.push_str(&format!(
            "  <url>\n    <loc>{}</loc>\n    <lastmod>{lastmod}</lastmod>\n    \
             <changefreq>{}</changefreq>\n    <priority>{:.1}</priority>\n  </url>\n",
            escape(loc.as_str()),
            entry.changefreq,
            entry.priority
        ));
    }
    xml.push_str("</urlset>\n");
    xml
}
