//! Integration tests for top-N ranking

use jet_image_top_n::{rank, LabelList, ScoreBuffer, TopNRanker};
use std::io::Write;

fn imagenet_like_labels(count: usize) -> LabelList {
    (0..count).map(|i| format!("class_{:04}", i)).collect()
}

/// Distinct scores in a scrambled order
fn scrambled_scores(batch_size: usize, num_classes: usize) -> Vec<f32> {
    (0..batch_size * num_classes)
        .map(|i| ((i * 7919 + 13) % (batch_size * num_classes)) as f32 / 1000.0)
        .collect()
}

#[test]
fn test_ranking_round_trips_to_input_scores() {
    let batch_size = 4;
    let num_classes = 1000;
    let labels = imagenet_like_labels(num_classes);
    let data = scrambled_scores(batch_size, num_classes);
    let scores = ScoreBuffer::new(data.clone(), batch_size, num_classes).unwrap();

    let results = rank(&scores, &labels, 5);

    assert_eq!(results.len(), batch_size);
    for (b, result) in results.iter().enumerate() {
        assert_eq!(result.batch_index, b);
        assert_eq!(result.len(), 5);
        for pair in result.entries.windows(2) {
            assert!(pair[0].score > pair[1].score);
        }
        for entry in &result.entries {
            let class_id = labels.iter().position(|l| l == entry.label).unwrap();
            assert_eq!(class_id, entry.class_id);
            assert_eq!(data[b * num_classes + class_id], entry.score);
        }

        let mut sorted: Vec<f32> = data[b * num_classes..(b + 1) * num_classes].to_vec();
        sorted.sort_by(|a, b| b.partial_cmp(a).unwrap());
        let top: Vec<f32> = result.entries.iter().map(|e| e.score).collect();
        assert_eq!(top, sorted[..5].to_vec());
    }
}

#[test]
fn test_n_larger_than_label_list() {
    let labels: LabelList = ["QCD", "top", "W", "Z", "Higgs"].into_iter().collect();
    let scores = ScoreBuffer::new(vec![0.05, 0.6, 0.2, 0.1, 0.05], 1, 5).unwrap();

    let results = rank(&scores, &labels, 50);

    assert_eq!(
        results[0].labels().collect::<Vec<_>>(),
        vec!["top", "W", "Z", "Higgs", "QCD"]
    );
}

#[test]
fn test_ranker_with_label_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    for name in ["tench", "goldfish", "great white shark", "tiger shark"] {
        writeln!(file, "{}", name).unwrap();
    }
    let labels = LabelList::from_file(file.path()).unwrap();
    let ranker = TopNRanker::new(labels, 2);

    let scores = ScoreBuffer::new(vec![0.1, 0.2, 0.3, 0.4, 0.9, 0.0, 0.0, 0.1], 2, 4).unwrap();
    let results = ranker.rank(&scores);

    assert_eq!(
        results[0].labels().collect::<Vec<_>>(),
        vec!["tiger shark", "great white shark"]
    );
    assert_eq!(
        results[1].labels().collect::<Vec<_>>(),
        vec!["tench", "tiger shark"]
    );
}

#[test]
fn test_results_serialize_for_reporting() {
    let labels: LabelList = ["cat", "dog", "fox"].into_iter().collect();
    let scores = ScoreBuffer::new(vec![0.1, 0.9, 0.3], 1, 3).unwrap();
    let results = rank(&scores, &labels, 1);

    let json = serde_json::to_value(&results).unwrap();
    assert_eq!(json[0]["batch_index"], 0);
    assert_eq!(json[0]["entries"][0]["label"], "dog");
    assert_eq!(json[0]["entries"][0]["class_id"], 1);
}
