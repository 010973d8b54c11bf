use crate::models::{JobOffer, Source};
use serde::{Deserialize, Serialize};

/// Summary of one run's final offer set.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Statistics {
    pub total: usize,
    /// Offers per source, in order of first appearance
    pub by_source: Vec<(Source, usize)>,
    pub remote_count: usize,
    pub with_salary_count: usize,
    /// Integer percentages, rounded down; 0 when there are no offers
    pub remote_pct: usize,
    pub salary_pct: usize,
    pub duplicates_dropped: usize,
}

impl Statistics {
    pub fn compute(offers: &[JobOffer], duplicates_dropped: usize) -> Self {
        let mut by_source: Vec<(Source, usize)> = Vec::new();
        for offer in offers {
            match by_source.iter_mut().find(|(s, _)| *s == offer.source) {
                Some((_, n)) => *n += 1,
                None => by_source.push((offer.source, 1)),
            }
        }

        let total = offers.len();
        let remote_count = offers.iter().filter(|o| o.remote).count();
        let with_salary_count = offers.iter().filter(|o| o.has_salary()).count();

        Self {
            total,
            by_source,
            remote_count,
            with_salary_count,
            remote_pct: percent(remote_count, total),
            salary_pct: percent(with_salary_count, total),
            duplicates_dropped,
        }
    }

    pub fn count_for(&self, source: Source) -> usize {
        self.by_source
            .iter()
            .find(|(s, _)| *s == source)
            .map_or(0, |(_, n)| *n)
    }
}

fn percent(part: usize, total: usize) -> usize {
    if total == 0 {
        0
    } else {
        part * 100 / total
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn offer(source: Source, remote: bool, salary: Option<&str>) -> JobOffer {
        JobOffer {
            id: String::new(),
            title: "t".to_string(),
            company: "c".to_string(),
            location: String::new(),
            description: String::new(),
            url: String::new(),
            source,
            posted_date: None,
            salary: salary.map(str::to_string),
            contract_type: None,
            remote,
            scraped_at: Utc::now(),
            raw_data: None,
        }
    }

    #[test]
    fn empty_set_is_all_zero() {
        assert_eq!(Statistics::compute(&[], 0), Statistics::default());
    }

    #[test]
    fn counts_and_floor_percentages() {
        let offers = vec![
            offer(Source::IndeedBe, true, Some("€40k")),
            offer(Source::Vdab, false, None),
            offer(Source::IndeedBe, false, Some("")),
        ];
        let stats = Statistics::compute(&offers, 2);

        assert_eq!(stats.total, 3);
        assert_eq!(stats.by_source, vec![(Source::IndeedBe, 2), (Source::Vdab, 1)]);
        assert_eq!(stats.remote_count, 1);
        assert_eq!(stats.with_salary_count, 1);
        assert_eq!(stats.remote_pct, 33);
        assert_eq!(stats.salary_pct, 33);
        assert_eq!(stats.duplicates_dropped, 2);
        assert_eq!(stats.count_for(Source::Vdab), 1);
    }
}
