use crate::url::NormalizedUrl;
use serde::Serialize;
use std::collections::BTreeMap;

/// Discovered link structure of a crawl
///
/// Every fetched page maps to the normalized links found on it, whether or
/// not those links were admitted to the frontier.
#[derive(Debug, Clone, Default, Serialize)]
pub struct LinkGraph {
    outbound: BTreeMap<NormalizedUrl, Vec<NormalizedUrl>>,
    inbound: BTreeMap<NormalizedUrl, u32>,
}

impl LinkGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one link `from -> to`
    pub fn record_link(&mut self, from: &NormalizedUrl, to: &NormalizedUrl) {
        self.outbound
            .entry(from.clone())
            .or_default()
            .push(to.clone());
        *self.inbound.entry(to.clone()).or_insert(0) += 1;
    }

    /// Registers a fetched page, even if it has no outgoing links
    pub fn record_page(&mut self, page: &NormalizedUrl) {
        self.outbound.entry(page.clone()).or_default();
    }

    /// Links found on `page`, in discovery order
    pub fn outbound(&self, page: &NormalizedUrl) -> &[NormalizedUrl] {
        self.outbound.get(page).map(Vec::as_slice).unwrap_or_default()
    }

    /// Number of times `page` was linked to
    pub fn inbound_count(&self, page: &NormalizedUrl) -> u32 {
        self.inbound.get(page).copied().unwrap_or(0)
    }

    /// Number of pages with an outbound entry
    pub fn page_count(&self) -> usize {
        self.outbound.len()
    }

    /// Total number of recorded links
    pub fn total_links(&self) -> usize {
        self.outbound.values().map(Vec::len).sum()
    }

    /// Most linked-to pages, highest count first
    pub fn most_linked(&self, limit: usize) -> Vec<(&NormalizedUrl, u32)> {
        let mut ranked: Vec<_> = self.inbound.iter().map(|(url, n)| (url, *n)).collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        ranked.truncate(limit);
        ranked
    }

    /// Pages with the most outgoing links, highest count first
    pub fn most_outgoing(&self, limit: usize) -> Vec<(&NormalizedUrl, usize)> {
        let mut ranked: Vec<_> = self
            .outbound
            .iter()
            .map(|(url, links)| (url, links.len()))
            .collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        ranked.truncate(limit);
        ranked
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::url::normalize_url;

    fn url(raw: &str) -> NormalizedUrl {
        normalize_url(raw, None).unwrap()
    }

    #[test]
    fn test_record_links() {
        let mut graph = LinkGraph::new();
        let home = url("https://a.com/");
        let docs = url("https://a.com/docs");
        let blog = url("https://a.com/blog");

        graph.record_link(&home, &docs);
        graph.record_link(&home, &blog);
        graph.record_link(&blog, &docs);
        graph.record_page(&docs);

        assert_eq!(graph.outbound(&home), &[docs.clone(), blog.clone()]);
        assert!(graph.outbound(&docs).is_empty());
        assert_eq!(graph.inbound_count(&docs), 2);
        assert_eq!(graph.inbound_count(&home), 0);
        assert_eq!(graph.page_count(), 3);
        assert_eq!(graph.total_links(), 3);
    }

    #[test]
    fn test_rankings() {
        let mut graph = LinkGraph::new();
        let a = url("https://a.com/a");
        let b = url("https://a.com/b");
        let c = url("https://a.com/c");

        graph.record_link(&a, &c);
        graph.record_link(&a, &b);
        graph.record_link(&b, &c);

        let linked = graph.most_linked(1);
        assert_eq!(linked, vec![(&c, 2)]);

        let outgoing = graph.most_outgoing(10);
        assert_eq!(outgoing, vec![(&a, 2), (&b, 1)]);
    }
}
