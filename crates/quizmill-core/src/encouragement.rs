//! Score-banded encouragement messages shown with the graded result.

use rand::Rng;

use crate::model::Lang;

struct Band {
    min: u32,
    max: u32,
    messages: &'static [(&'static str, &'static str)],
}

const BANDS_EN: &[Band] = &[
    Band {
        min: 0,
        max: 40,
        messages: &[
            ("Keep it up! Study a bit more and you'll see improvement.", "📚"),
            ("Chin up! Every quiz is a step towards mastery.", "🚶"),
            ("Remember, every master was once a beginner. Keep pushing!", "🌱"),
            (
                "It's not about being perfect. It's about effort. And that's what you're showing!",
                "💪",
            ),
            ("Mistakes are proof that you are trying. Keep it up!", "🔧"),
        ],
    },
    Band {
        min: 41,
        max: 60,
        messages: &[
            ("Good effort! You're getting there.", "🌟"),
            ("Not bad! A little push and you'll soar high.", "🚀"),
            ("You're making progress. Every bit counts!", "⏳"),
            ("Solid work! A bit more fine-tuning, and you're golden.", "🛠"),
            ("You've got potential. Let's unlock it together!", "🔑"),
        ],
    },
    Band {
        min: 61,
        max: 80,
        messages: &[
            ("Great job! You've got a good handle on this.", "👍"),
            ("Well done! You're on the right track.", "🛤"),
            ("You're doing a great job! Keep this momentum going.", "🌪"),
            ("Impressive! Your hard work is paying off.", "💼"),
            ("Strong performance! Your dedication is showing.", "🎯"),
        ],
    },
    Band {
        min: 81,
        max: 100,
        messages: &[
            ("Outstanding performance!", "🎉"),
            ("You're a star! Amazing work!", "⭐"),
            ("Excellence is not an act, but a habit. You're there!", "🏆"),
            ("Phenomenal! You've set the bar high!", "🌈"),
            ("Masterful! You're inspiring greatness.", "🌟"),
            ("Superb! You've outdone yourself.", "🚀"),
        ],
    },
];

const BANDS_FR: &[Band] = &[
    Band {
        min: 0,
        max: 40,
        messages: &[
            (
                "Continuez comme ça ! Étudiez un peu plus et vous verrez des améliorations.",
                "📚",
            ),
            ("Gardez le moral ! Chaque quiz est un pas vers la maîtrise.", "🚶"),
            (
                "Rappelez-vous, chaque maître a été un jour un débutant. Continuez à pousser !",
                "🌱",
            ),
            (
                "Ce n'est pas une question de perfection. C'est une question d'effort. Et c'est ce que vous montrez !",
                "💪",
            ),
            ("Les erreurs sont la preuve que vous essayez. Continuez comme ça !", "🔧"),
        ],
    },
    Band {
        min: 41,
        max: 60,
        messages: &[
            ("Bel effort ! Vous y arrivez.", "🌟"),
            ("Pas mal ! Un petit coup de pouce et vous vous envolerez haut.", "🚀"),
            ("Vous progressez. Chaque petit pas compte !", "⏳"),
            ("Travail solide ! Un peu plus de peaufinage, et vous êtes au top.", "🛠"),
            ("Vous avez du potentiel. Débloquons-le ensemble !", "🔑"),
        ],
    },
    Band {
        min: 61,
        max: 80,
        messages: &[
            ("Excellent travail ! Vous avez bien maîtrisé cela.", "👍"),
            ("Bien joué ! Vous êtes sur la bonne voie.", "🛤"),
            ("Vous faites du bon travail ! Continuez sur cette lancée.", "🌪"),
            ("Impressionnant ! Votre travail acharné porte ses fruits.", "💼"),
            ("Belle performance ! Votre dévouement se montre.", "🎯"),
        ],
    },
    Band {
        min: 81,
        max: 100,
        messages: &[
            ("Performance exceptionnelle !", "🎉"),
            ("Vous êtes une star ! Travail incroyable !", "⭐"),
            ("L'excellence n'est pas un acte, mais une habitude. Vous y êtes !", "🏆"),
            ("Phénoménal ! Vous avez placé la barre haut !", "🌈"),
            ("Magistral ! Vous inspirez la grandeur.", "🌟"),
            ("Superbe ! Vous vous êtes surpassé.", "🚀"),
        ],
    },
];

const FALLBACK_EN: (&str, &str) = ("Keep trying!", "💪");
const FALLBACK_FR: (&str, &str) = ("Continuez d'essayer !", "💪");

/// Pick a random encouragement line for a percentage score.
pub fn encouragement<R: Rng>(
    percentage: f64,
    lang: Lang,
    rng: &mut R,
) -> (&'static str, &'static str) {
    let bands = match lang {
        Lang::En => BANDS_EN,
        Lang::Fr => BANDS_FR,
    };
    let score = percentage.round().clamp(0.0, 100.0) as u32;
    match bands.iter().find(|b| score >= b.min && score <= b.max) {
        Some(band) => band.messages[rng.gen_range(0..band.messages.len())],
        None => match lang {
            Lang::En => FALLBACK_EN,
            Lang::Fr => FALLBACK_FR,
        },
    }
}
