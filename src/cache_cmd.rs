//! `lexfuse cache stats` and `lexfuse cache clear`.

use anyhow::Result;

use lexfuse_core::store::CacheStore;

use crate::bootstrap;
use crate::config::Config;

pub async fn run_stats(config: &Config) -> Result<()> {
    let cache = bootstrap::open_cache(config).await?;
    let stats = cache.stats().await?;

    let db_size = std::fs::metadata(&config.cache.path)
        .map(|m| m.len())
        .unwrap_or(0);

    println!("lexfuse — Response Cache");
    println!("========================");
    println!();
    println!("  Cache:       {}", config.cache.path.display());
    println!("  Size:        {}", format_bytes(db_size));
    println!();
    println!("  Entries:     {}", stats.entries);
    println!("  Total hits:  {}", stats.total_hits);

    if !stats.by_kind.is_empty() {
        println!();
        println!("  {:<12} {:>8} {:>8}", "KIND", "ENTRIES", "HITS");
        for (kind, k) in &stats.by_kind {
            println!("  {:<12} {:>8} {:>8}", kind, k.entries, k.hits);
        }
    }

    Ok(())
}

pub async fn run_clear(config: &Config, prefix: Option<&str>) -> Result<()> {
    let cache = bootstrap::open_cache(config).await?;
    let removed = cache.invalidate(prefix).await?;
    match prefix {
        Some(p) => println!("Removed {} cache entr{} with prefix '{}'.", removed, plural_y(removed), p),
        None => println!("Removed {} cache entr{}.", removed, plural_y(removed)),
    }
    Ok(())
}

fn plural_y(n: u64) -> &'static str {
    if n == 1 {
        "y"
    } else {
        "ies"
    }
}

fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else if bytes < 1024 * 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.2} GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2.0 KB");
        assert_eq!(format_bytes(5 * 1024 * 1024), "5.0 MB");
    }

    #[test]
    fn test_plural() {
        assert_eq!(plural_y(1), "y");
        assert_eq!(plural_y(0), "ies");
    }
}
