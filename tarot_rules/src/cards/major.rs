//! Major arcana reference data.

use super::Element;

/// Static definition of a major arcana card.
#[derive(Debug)]
pub struct MajorDef {
    pub name: &'static str,
    /// Golden Dawn elemental attribution.
    pub element: Element,
    pub correspondence: &'static str,
    pub upright: &'static [&'static str],
    pub reversed: &'static [&'static str],
    pub imagery: &'static str,
}

/// Majors in Rider-Waite-Smith order (Strength 8, Justice 11).
pub static MAJOR_ARCANA: [MajorDef; 22] = [
    MajorDef {
        name: "The Fool",
        element: Element::Air,
        correspondence: "Aleph • Air",
        upright: &["beginnings", "spontaneity", "trust"],
        reversed: &["recklessness", "hesitation"],
        imagery: "a white rose held lightly at a cliff's edge",
    },
    MajorDef {
        name: "The Magician",
        element: Element::Air,
        correspondence: "Beth • Mercury",
        upright: &["willpower", "skill", "manifestation"],
        reversed: &["scattered focus", "manipulation"],
        imagery: "an infinity sign above a raised wand, every tool laid out on the table",
    },
    MajorDef {
        name: "The High Priestess",
        element: Element::Water,
        correspondence: "Gimel • Moon",
        upright: &["intuition", "inner knowing", "mystery"],
        reversed: &["hidden agendas", "disconnection from intuition"],
        imagery: "a veil of pomegranates hung between two pillars",
    },
    MajorDef {
        name: "The Empress",
        element: Element::Earth,
        correspondence: "Daleth • Venus",
        upright: &["abundance", "nurture", "creativity"],
        reversed: &["dependence", "creative block"],
        imagery: "wheat ripening around a cushioned throne",
    },
    MajorDef {
        name: "The Emperor",
        element: Element::Fire,
        correspondence: "Heh • Aries",
        upright: &["structure", "authority", "stability"],
        reversed: &["rigidity", "control"],
        imagery: "a stone throne carved with rams' heads",
    },
    MajorDef {
        name: "The Hierophant",
        element: Element::Earth,
        correspondence: "Vav • Taurus",
        upright: &["tradition", "teaching", "belonging"],
        reversed: &["rebellion", "dogma"],
        imagery: "crossed keys resting at a teacher's feet",
    },
    MajorDef {
        name: "The Lovers",
        element: Element::Air,
        correspondence: "Zain • Gemini",
        upright: &["union", "choice", "values"],
        reversed: &["misalignment", "disharmony"],
        imagery: "an angel's wings spread wide over two figures",
    },
    MajorDef {
        name: "The Chariot",
        element: Element::Water,
        correspondence: "Cheth • Cancer",
        upright: &["determination", "direction", "momentum"],
        reversed: &["loss of direction", "scattered will"],
        imagery: "two sphinxes straining in opposite directions",
    },
    MajorDef {
        name: "Strength",
        element: Element::Fire,
        correspondence: "Teth • Leo",
        upright: &["courage", "compassion", "inner resolve"],
        reversed: &["self-doubt", "raw emotion"],
        imagery: "a gentle hand resting on a lion's jaw",
    },
    MajorDef {
        name: "The Hermit",
        element: Element::Earth,
        correspondence: "Yod • Virgo",
        upright: &["introspection", "solitude", "guidance"],
        reversed: &["isolation", "withdrawal"],
        imagery: "a lantern held up on a snowy peak",
    },
    MajorDef {
        name: "Wheel of Fortune",
        element: Element::Fire,
        correspondence: "Kaph • Jupiter",
        upright: &["cycles", "turning points", "chance"],
        reversed: &["resistance to change", "setbacks"],
        imagery: "a great wheel turning among the clouds",
    },
    MajorDef {
        name: "Justice",
        element: Element::Air,
        correspondence: "Lamed • Libra",
        upright: &["fairness", "truth", "accountability"],
        reversed: &["imbalance", "avoidance"],
        imagery: "scales held level beside an upright blade",
    },
    MajorDef {
        name: "The Hanged Man",
        element: Element::Water,
        correspondence: "Mem • Water",
        upright: &["surrender", "new perspective", "pause"],
        reversed: &["stalling", "resistance"],
        imagery: "a calm, haloed face suspended upside down",
    },
    MajorDef {
        name: "Death",
        element: Element::Water,
        correspondence: "Nun • Scorpio",
        upright: &["endings", "transformation", "release"],
        reversed: &["clinging", "stagnation"],
        imagery: "a white rose banner carried through a quiet field",
    },
    MajorDef {
        name: "Temperance",
        element: Element::Fire,
        correspondence: "Samekh • Sagittarius",
        upright: &["balance", "moderation", "blending"],
        reversed: &["excess", "misalignment"],
        imagery: "water poured patiently from one vessel into another",
    },
    MajorDef {
        name: "The Devil",
        element: Element::Earth,
        correspondence: "Ayin • Capricorn",
        upright: &["attachment", "shadow", "temptation"],
        reversed: &["release", "reclaiming power"],
        imagery: "loose chains hanging around two figures",
    },
    MajorDef {
        name: "The Tower",
        element: Element::Fire,
        correspondence: "Pe • Mars",
        upright: &["upheaval", "revelation", "sudden change"],
        reversed: &["averted disaster", "fear of change"],
        imagery: "lightning splitting a crown from a high wall",
    },
    MajorDef {
        name: "The Star",
        element: Element::Air,
        correspondence: "Tzaddi • Aquarius",
        upright: &["hope", "renewal", "serenity"],
        reversed: &["discouragement", "faith tested"],
        imagery: "water poured into a still pool under an open sky",
    },
    MajorDef {
        name: "The Moon",
        element: Element::Water,
        correspondence: "Qoph • Pisces",
        upright: &["intuition", "illusion", "dreams"],
        reversed: &["clarity returning", "released fear"],
        imagery: "a winding path between two towers at night",
    },
    MajorDef {
        name: "The Sun",
        element: Element::Fire,
        correspondence: "Resh • Sol",
        upright: &["joy", "vitality", "success"],
        reversed: &["temporary clouds", "dimmed optimism"],
        imagery: "a child riding through sunflowers",
    },
    MajorDef {
        name: "Judgement",
        element: Element::Fire,
        correspondence: "Shin • Fire",
        upright: &["awakening", "reckoning", "calling"],
        reversed: &["self-doubt", "ignoring the call"],
        imagery: "a trumpet call rising over open ground",
    },
    MajorDef {
        name: "The World",
        element: Element::Earth,
        correspondence: "Tau • Saturn",
        upright: &["completion", "integration", "wholeness"],
        reversed: &["loose ends", "delay"],
        imagery: "a dancer framed by a laurel wreath",
    },
];
