use paperlists::codec::{compress, decompress};
use paperlists::constants::histogram::BUCKETS;
use paperlists::summarizer::{RecordFilter, Summarizer};
use paperlists::tiers::{TierRegistry, TierTable};
use paperlists::{
    title_similarity, JoinStrategy, Merger, Record, RecordSource, VenuePolicy,
};

fn platform(id: &str, title: &str, status: &str, rating: &str) -> Record {
    Record::new(RecordSource::ReviewPlatform)
        .with_field("id", id)
        .with_field("title", title)
        .with_field("status", status)
        .with_field("track", "main")
        .with_field("rating", rating)
}

fn site(title: &str) -> Record {
    // The author field carries the site title so tests can recover which
    // site row a merged record paired with.
    Record::new(RecordSource::Site)
        .with_field("title", title)
        .with_field("status", "Poster")
        .with_field("track", "main")
        .with_field("author", title)
}

fn title_only_policy() -> VenuePolicy {
    VenuePolicy {
        join: JoinStrategy::TitleOnly,
        t_order: vec![
            "Oral".into(),
            "Poster".into(),
            "Reject".into(),
            "Active".into(),
        ],
        ..VenuePolicy::default()
    }
}

#[test]
fn codec_round_trip_is_identity_for_all_arrays_and_thresholds() {
    let arrays: Vec<Vec<u64>> = vec![
        vec![],
        vec![0],
        vec![7],
        vec![0; 250],
        vec![1, 0, 0, 0, 0, 2, 0, 3],
        (0..100).map(|i| if i % 9 == 0 { i } else { 0 }).collect(),
    ];
    for values in &arrays {
        for threshold in 0..10 {
            let encoded = compress(values, threshold);
            let decoded = decompress(&encoded, values.len()).unwrap();
            assert_eq!(&decoded, values, "threshold {threshold}");
        }
    }
}

#[test]
fn histogram_sums_equal_filtered_record_counts_for_every_combination() {
    let records = vec![
        platform("1", "A", "Oral", "8;9").with_field("confidence", "4;5"),
        platform("2", "B", "Poster", "6;5").with_field("confidence", "3;4"),
        platform("3", "C", "Poster", "5;5").with_field("confidence", "4;4"),
        platform("4", "D", "Reject", "3;2").with_field("confidence", "5;3"),
    ];
    let policy = title_only_policy();
    let summarizer = Summarizer::new(&policy);

    let filters = [
        RecordFilter::default(),
        RecordFilter::by_status("Poster"),
        RecordFilter::by_status("Oral"),
        RecordFilter {
            track: Some("main".into()),
            ..RecordFilter::default()
        },
        RecordFilter::by_status("Withdraw"), // matches nothing
    ];
    let expected = [4usize, 2, 1, 4, 0];

    for field in ["rating", "confidence"] {
        for (filter, &expected_sum) in filters.iter().zip(&expected) {
            let series = summarizer.histogram(&records, field, filter);
            assert_eq!(series.sum, expected_sum, "{field}");
            let buckets = decompress(&series.data, BUCKETS).unwrap();
            assert_eq!(buckets.iter().sum::<u64>() as usize, expected_sum, "{field}");
        }
    }
}

#[test]
fn terminal_tier_counts_sum_to_total_minus_active() {
    let records = vec![
        platform("1", "A", "Oral", "8"),
        platform("2", "B", "Poster", "6"),
        platform("3", "C", "Poster", "5"),
        platform("4", "D", "Reject", "2"),
        platform("5", "E", "Active", "6"),
        platform("6", "F", "Active", "4"),
    ];
    let policy = title_only_policy();
    let mut registry = TierRegistry::new();
    let table = TierTable::from_records(&records, &policy, &[], &mut registry);

    let active = table.count_of("Active");
    let terminal_sum: usize = table
        .terminal_entries()
        .map(|entry| entry.count)
        .sum();
    assert_eq!(terminal_sum, table.total - active);

    // With every decision final the terminal tiers carry the whole total.
    let decided: Vec<Record> = records
        .iter()
        .filter(|record| record.status() != "Active")
        .cloned()
        .collect();
    let mut registry = TierRegistry::new();
    let final_table = TierTable::from_records(&decided, &policy, &[], &mut registry);
    let final_sum: usize = final_table.terminal_entries().map(|e| e.count).sum();
    assert_eq!(final_sum, final_table.total);
}

#[test]
fn fuzzy_matches_never_fall_below_the_cutoff_they_were_taken_at() {
    // Discarding site leftovers keeps the merged list down to matched pairs
    // and platform rows, so the pair check below sees only real matches.
    let policy = VenuePolicy {
        leftovers: paperlists::LeftoverPolicy::DiscardSecondary,
        ..title_only_policy()
    };
    let a = vec![
        platform("1", "Robust Speech Recognition via Large Scale Weak Supervision", "Poster", "6"),
        platform("2", "Neural Ordinary Differential Equations", "Poster", "6"),
        platform("3", "Attention Is All You Need", "Poster", "6"),
    ];
    let b = vec![
        site("Robust Speech Recognition via Large-Scale Weak Supervision"),
        site("Neural Ordinary Differential Equation"),
        site("A Completely Unrelated Manuscript About Beekeeping"),
    ];

    let outcome = Merger::new(&policy).merge(a, b).unwrap();
    let min_cutoff = outcome.diagnostics.min_cutoff.expect("fuzzy matches occurred");
    assert!(min_cutoff >= 0.70);

    // Each matched pair's recomputed similarity clears the sweep floor and
    // the recorded minimum.
    let mut matched = 0;
    for record in &outcome.records {
        let Some(site_title) = record.field("author") else {
            continue;
        };
        let ratio = title_similarity(
            &record.title_key(),
            &paperlists::utils::normalize_title(site_title),
        );
        assert!(ratio >= min_cutoff, "pair matched below its cutoff");
        matched += 1;
    }
    assert_eq!(matched, 2);

    // The unrelated site row found no partner at any cutoff.
    assert_eq!(outcome.diagnostics.leftover_secondary, 1);
    assert!(outcome.unmatched_secondary[0]
        .field("author")
        .unwrap()
        .contains("Beekeeping"));

    // Per-cutoff bookkeeping agrees with the recorded minimum.
    let lowest_bucket = outcome
        .diagnostics
        .matches_per_cutoff
        .iter()
        .map(|&(cutoff_pct, _)| cutoff_pct)
        .min()
        .unwrap();
    assert!((f64::from(lowest_bucket) / 100.0 - min_cutoff).abs() < 1e-9);
}

#[test]
fn merging_an_already_merged_list_with_nothing_is_identity() {
    let policy = title_only_policy();
    let a = vec![
        platform("1", "Alpha Paper", "Poster", "6"),
        platform("2", "Beta Paper", "Oral", "8"),
    ];
    let b = vec![site("Alpha Paper"), site("Site Only Paper")];

    let first = Merger::new(&policy).merge(a, b).unwrap();
    let second = Merger::new(&policy)
        .merge(first.records.clone(), Vec::new())
        .unwrap();

    let first_fields: Vec<_> = first.records.iter().map(|r| r.fields.clone()).collect();
    let second_fields: Vec<_> = second.records.iter().map(|r| r.fields.clone()).collect();
    assert_eq!(first_fields, second_fields);
    assert_eq!(second.diagnostics.exact_matches, 0);
    assert!(second.diagnostics.min_cutoff.is_none());
}

#[test]
fn transfer_matrix_drops_exactly_the_inserted_final_only_record() {
    let policy = title_only_policy();
    let summarizer = Summarizer::new(&policy);
    let initial = vec![
        platform("1", "A", "Active", "5"),
        platform("2", "B", "Active", "4"),
        platform("3", "C", "Active", "7"),
    ];
    let mut finals = vec![
        platform("1", "A", "Poster", "6"),
        platform("2", "B", "Reject", "3"),
        platform("3", "C", "Oral", "8"),
    ];
    finals.insert(1, platform("99", "Inserted Late", "Poster", "6"));

    let series = summarizer
        .transfer_matrix(&finals, &initial, "rating", &RecordFilter::default())
        .unwrap();
    assert_eq!(series.sum, 3);
}
