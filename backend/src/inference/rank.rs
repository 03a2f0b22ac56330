use crate::error::InvalidScoreVectorError;
use shared::{ClassConfidence, DiagnosisResult};

/// Index of the highest score; the first one wins on ties and NaN never wins.
pub fn argmax(scores: &[f32]) -> Option<usize> {
    let mut best: Option<usize> = None;
    for (i, &score) in scores.iter().enumerate() {
        match best {
            None => best = Some(i),
            Some(b) if scores[b].is_nan() && !score.is_nan() => best = Some(i),
            Some(b) if score > scores[b] => best = Some(i),
            _ => {}
        }
    }
    best
}

pub fn rank<S: AsRef<str>>(
    scores: &[f32],
    labels: &[S],
) -> Result<DiagnosisResult, InvalidScoreVectorError> {
    if scores.len() != labels.len() {
        return Err(InvalidScoreVectorError::LengthMismatch {
            scores: scores.len(),
            labels: labels.len(),
        });
    }
    let primary_index = argmax(scores).ok_or(InvalidScoreVectorError::Empty)?;

    let breakdown: Vec<ClassConfidence> = scores
        .iter()
        .zip(labels)
        .map(|(&score, label)| ClassConfidence {
            label: label.as_ref().to_string(),
            percentage: score * 100.0,
        })
        .collect();

    Ok(DiagnosisResult {
        primary_index,
        primary: breakdown[primary_index].clone(),
        breakdown,
    })
}

/// Numerically stable softmax for models exported without a normalizing head.
pub fn softmax(scores: &[f32]) -> Vec<f32> {
    let max = scores.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = scores.iter().map(|&s| (s - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::SkinType;

    fn labels() -> Vec<String> {
        SkinType::labels()
    }

    #[test]
    fn dry_skin_scenario() {
        let result = rank(&[0.7, 0.1, 0.1, 0.1], &labels()).unwrap();
        assert_eq!(result.primary_index, 0);
        assert_eq!(result.primary.label, "Dry Skin");
        assert!((result.primary.percentage - 70.0).abs() < 1e-4);

        let expected = [
            ("Dry Skin", 70.0),
            ("Acne Skin", 10.0),
            ("Oily Skin", 10.0),
            ("Normal Skin", 10.0),
        ];
        assert_eq!(result.breakdown.len(), expected.len());
        for (entry, (label, pct)) in result.breakdown.iter().zip(expected) {
            assert_eq!(entry.label, label);
            assert!((entry.percentage - pct).abs() < 1e-4);
        }
        assert_eq!(shared::format_percentage(result.primary.percentage), "70.0%");
    }

    #[test]
    fn picks_true_maximum() {
        let cases: [([f32; 4], usize); 4] = [
            ([0.1, 0.2, 0.3, 0.4], 3),
            ([0.05, 0.8, 0.1, 0.05], 1),
            ([0.2, 0.2, 0.59, 0.01], 2),
            ([0.9, 0.0, 0.05, 0.05], 0),
        ];
        for (scores, expected) in cases {
            assert_eq!(rank(&scores, &labels()).unwrap().primary_index, expected);
        }
    }

    #[test]
    fn ties_go_to_lowest_index() {
        let result = rank(&[0.1, 0.4, 0.1, 0.4], &labels()).unwrap();
        assert_eq!(result.primary_index, 1);
        assert_eq!(result.primary.label, "Acne Skin");

        assert_eq!(argmax(&[0.25, 0.25, 0.25, 0.25]), Some(0));
    }

    #[test]
    fn nan_never_wins() {
        assert_eq!(argmax(&[f32::NAN, 0.1, 0.3, 0.2]), Some(2));
        assert_eq!(argmax(&[0.1, f32::NAN, 0.05]), Some(0));
    }

    #[test]
    fn ranking_is_idempotent() {
        let scores = [0.3, 0.3, 0.2, 0.2];
        assert_eq!(
            rank(&scores, &labels()).unwrap(),
            rank(&scores, &labels()).unwrap()
        );
    }

    #[test]
    fn length_mismatch_fails_fast() {
        let err = rank(&[0.5, 0.5, 0.0], &labels()).unwrap_err();
        assert!(matches!(
            err,
            InvalidScoreVectorError::LengthMismatch { scores: 3, labels: 4 }
        ));
    }

    #[test]
    fn empty_scores_are_invalid() {
        let none: [&str; 0] = [];
        assert!(matches!(
            rank(&[], &none),
            Err(InvalidScoreVectorError::Empty)
        ));
    }

    #[test]
    fn softmax_normalizes_and_preserves_order() {
        let probs = softmax(&[2.0, 1.0, 0.1, -1.0]);
        let sum: f32 = probs.iter().sum();
        assert!((sum - 1.0).abs() < 1e-5);
        assert_eq!(argmax(&probs), Some(0));
        assert!(probs.windows(2).all(|w| w[0] > w[1]));
    }
}
