use crate::search_client::PageItem;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SampleError {
    #[error("this location has no photos")]
    NoPhotos,
}

/// Draws up to `max` source URLs from one page of search results.
///
/// Items without a medium-size URL are skipped. When more than `max` eligible
/// URLs remain, `max` distinct indices are drawn without replacement via a
/// partial Fisher-Yates shuffle, so the call terminates regardless of how
/// often random indices would have collided.
pub fn sample_urls(items: &[PageItem], max: usize) -> Result<Vec<String>, SampleError> {
    let eligible: Vec<&str> = items
        .iter()
        .filter_map(|item| item.url_m.as_deref())
        .collect();

    if eligible.is_empty() {
        return Err(SampleError::NoPhotos);
    }

    if eligible.len() <= max {
        return Ok(eligible.into_iter().map(str::to_string).collect());
    }

    let mut rng = rand::rng();
    let chosen = rand::seq::index::sample(&mut rng, eligible.len(), max);
    Ok(chosen.iter().map(|i| eligible[i].to_string()).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn items_with_urls(count: usize) -> Vec<PageItem> {
        (0..count)
            .map(|i| PageItem {
                url_m: Some(format!("http://photos/{}.jpg", i)),
            })
            .collect()
    }

    #[test]
    fn test_small_page_returns_all_eligible() {
        let mut items = items_with_urls(3);
        items.push(PageItem { url_m: None });

        let urls = sample_urls(&items, 45).unwrap();
        assert_eq!(urls.len(), 3);
    }

    #[test]
    fn test_large_page_samples_exactly_max_distinct() {
        let items = items_with_urls(100);
        let urls = sample_urls(&items, 45).unwrap();

        assert_eq!(urls.len(), 45);
        let unique: HashSet<&String> = urls.iter().collect();
        assert_eq!(unique.len(), 45);

        let input: HashSet<String> = items
            .iter()
            .filter_map(|i| i.url_m.clone())
            .collect();
        assert!(urls.iter().all(|u| input.contains(u)));
    }

    #[test]
    fn test_no_eligible_urls_fails() {
        let items = vec![PageItem { url_m: None }, PageItem { url_m: None }];
        assert_eq!(sample_urls(&items, 45), Err(SampleError::NoPhotos));
        assert_eq!(sample_urls(&[], 45), Err(SampleError::NoPhotos));
    }

    #[test]
    fn test_boundary_page_size_is_not_sampled() {
        let items = items_with_urls(45);
        let urls = sample_urls(&items, 45).unwrap();
        assert_eq!(urls.len(), 45);
    }
}
