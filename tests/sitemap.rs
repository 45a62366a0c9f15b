use chrono::NaiveDate;

use toolbench::catalog;
use toolbench::sitemap::{STATIC_PAGES, build_sitemap, entries};

#[test]
fn every_page_and_tool_is_listed_once() {
    let entries = entries();
    assert_eq!(entries.len(), STATIC_PAGES.len() + catalog::all().len());
    assert_eq!(entries[0].path, "/");
    assert_eq!(entries[0].priority, 1.0);
    assert_eq!(entries[0].changefreq, "weekly");
}

#[test]
fn priorities_follow_page_kind() {
    for entry in entries() {
        if entry.path == "/" {
            continue;
        }
        if entry.path.starts_with("/tools/") {
            assert_eq!(entry.priority, 0.8, "{}", entry.path);
            assert_eq!(entry.changefreq, "weekly");
        } else {
            assert_eq!(entry.priority, 0.7, "{}", entry.path);
            assert_eq!(entry.changefreq, "monthly");
        }
    }
}

#[test]
fn xml_uses_base_url_and_date() {
    let date = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
    let xml = build_sitemap("https://tools.example.com/", date);

    assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
    assert!(xml.contains("<loc>https://tools.example.com/</loc>"));
    assert!(xml.contains("<loc>https://tools.example.com/tools/unit-converter</loc>"));
    assert!(xml.contains("<lastmod>2024-05-01</lastmod>"));
    assert!(xml.contains("<priority>0.8</priority>"));
    assert!(!xml.contains("example.com//"));
    assert_eq!(xml.matches("<url>").count(), entries().len());
}
