use image::GrayImage;
use imageproc::rect::Rect;

use crate::image_utils::count_foreground_in_rect;
use crate::types::Choice;

/// The rect of strip `choice` when `bounds` is split into `choices` equal
/// vertical strips. Strip width truncates, so the `width % choices`
/// rightmost columns belong to no strip.
pub fn choice_strip(bounds: &Rect, choices: u32, choice: u32) -> Option<Rect> {
    let strip_width = bounds.width() / choices.max(1);
    if strip_width == 0 {
        return None;
    }
    Some(
        Rect::at(bounds.left() + (choice * strip_width) as i32, bounds.top())
            .of_size(strip_width, bounds.height()),
    )
}

/// Foreground pixel counts of each choice strip, left to right. Strips too
/// narrow to hold a column count as empty.
pub fn strip_fill_counts(mask: &GrayImage, bounds: &Rect, choices: u32) -> Vec<u32> {
    (0..choices)
        .map(|choice| {
            choice_strip(bounds, choices, choice)
                .map_or(0, |strip| count_foreground_in_rect(mask, &strip))
        })
        .collect()
}

/// Index of the strictly greatest count. Ties go to the earliest strip and
/// an all-empty row still yields the first one.
pub fn densest_strip(counts: &[u32]) -> u32 {
    let mut best: Option<(u32, u32)> = None;
    for (i, &count) in counts.iter().enumerate() {
        match best {
            Some((best_count, _)) if count <= best_count => {}
            _ => best = Some((count, i as u32)),
        }
    }
    best.map_or(0, |(_, i)| i)
}

/// Picks the choice whose strip of `bounds` holds the most ink. There is no
/// "unanswered" outcome: blank or ambiguous rows still produce a letter.
pub fn classify_fill(mask: &GrayImage, bounds: &Rect, choices: u32) -> Choice {
    let counts = strip_fill_counts(mask, bounds, choices);
    Choice::from_index(densest_strip(&counts)).unwrap_or(Choice::A)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image_utils::FOREGROUND;
    use imageproc::drawing::draw_filled_rect_mut;
    use proptest::prelude::*;

    fn mask_with_fill(bounds: Rect, filled: Rect) -> GrayImage {
        let mut mask = GrayImage::new(
            (bounds.right() + 10) as u32,
            (bounds.bottom() + 10) as u32,
        );
        draw_filled_rect_mut(&mut mask, filled, FOREGROUND);
        mask
    }

    #[test]
    fn test_choice_strip_truncates() {
        let bounds = Rect::at(10, 5).of_size(43, 20);
        assert_eq!(choice_strip(&bounds, 4, 0), Some(Rect::at(10, 5).of_size(10, 20)));
        assert_eq!(choice_strip(&bounds, 4, 3), Some(Rect::at(40, 5).of_size(10, 20)));
        assert_eq!(choice_strip(&Rect::at(0, 0).of_size(3, 3), 4, 0), None);
    }

    #[test]
    fn test_densest_strip_prefers_first_on_tie() {
        assert_eq!(densest_strip(&[10, 10, 5, 0]), 0);
        assert_eq!(densest_strip(&[0, 3, 3, 7]), 3);
        assert_eq!(densest_strip(&[0, 0, 0, 0]), 0);
        assert_eq!(densest_strip(&[]), 0);
    }

    #[test]
    fn test_classify_each_choice() {
        let bounds = Rect::at(20, 10).of_size(40, 20);
        for (choice, letter) in ['A', 'B', 'C', 'D'].into_iter().enumerate() {
            let filled = Rect::at(20 + 10 * choice as i32, 10).of_size(10, 20);
            let mask = mask_with_fill(bounds, filled);
            assert_eq!(strip_fill_counts(&mask, &bounds, 4)[choice], 200);
            assert_eq!(classify_fill(&mask, &bounds, 4).letter(), letter);
        }
    }

    #[test]
    fn test_classify_left_half_filled_is_a() {
        let bounds = Rect::at(0, 0).of_size(40, 20);
        let mask = mask_with_fill(bounds, Rect::at(0, 0).of_size(20, 20));
        assert_eq!(strip_fill_counts(&mask, &bounds, 4), vec![200, 200, 0, 0]);
        assert_eq!(classify_fill(&mask, &bounds, 4), Choice::A);
    }

    #[test]
    fn test_classify_ignores_remainder_columns() {
        // 43 wide: columns 40..43 fall outside every strip.
        let bounds = Rect::at(0, 0).of_size(43, 10);
        let mask = mask_with_fill(bounds, Rect::at(40, 0).of_size(3, 10));
        assert_eq!(strip_fill_counts(&mask, &bounds, 4), vec![0, 0, 0, 0]);
        assert_eq!(classify_fill(&mask, &bounds, 4), Choice::A);
    }

    #[test]
    fn test_classify_narrow_mark_does_not_panic() {
        let bounds = Rect::at(0, 0).of_size(3, 10);
        let mask = mask_with_fill(bounds, bounds);
        assert_eq!(strip_fill_counts(&mask, &bounds, 4), vec![0, 0, 0, 0]);
        assert_eq!(classify_fill(&mask, &bounds, 4), Choice::A);
    }

    proptest! {
        #[test]
        fn classify_never_panics(
            width in 1u32..120,
            height in 1u32..40,
            choices in 1u32..8,
            fill_x in 0i32..120,
            fill_width in 1u32..60
        ) {
            let bounds = Rect::at(5, 5).of_size(width, height);
            let mask = mask_with_fill(bounds, Rect::at(fill_x, 5).of_size(fill_width, height));
            let counts = strip_fill_counts(&mask, &bounds, choices);
            prop_assert_eq!(counts.len(), choices as usize);
            let choice = classify_fill(&mask, &bounds, choices);
            prop_assert!(choice.index() < choices);
            let chosen = counts[choice.index() as usize];
            prop_assert!(counts.iter().all(|&c| c <= chosen));
        }
    }
}
