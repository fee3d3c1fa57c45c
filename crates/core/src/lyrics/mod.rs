//! Static lyric timing table for the bundled song.

use serde::Serialize;

/// Song part a line belongs to. Descriptive only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Section {
    Intro,
    Verse,
    PreChorus,
    Chorus,
    Bridge,
    Outro,
}

/// One timed lyric line.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LyricLine {
    /// Seconds from the start of the track.
    pub time: f32,
    pub text: &'static str,
    pub section: Option<Section>,
}

const fn line(time: f32, text: &'static str, section: Section) -> LyricLine {
    LyricLine {
        time,
        text,
        section: Some(section),
    }
}

/// Timing table for "Ilaw ng Pag-ibig".
pub static ILAW_NG_PAG_IBIG: [LyricLine; 30] = [
    line(0.0, "(Instrumental)", Section::Intro),
    line(10.0, "Sa bawat tibok ng dibdib ko", Section::Verse),
    line(15.0, "Naririnig ang pangalan mo", Section::Verse),
    line(20.0, "Parang awit na hindi mawari", Section::Verse),
    line(25.0, "Kahit tahimik, dama'y malabo", Section::Verse),
    line(30.0, "Hawak kamay na, hindi ka bibitaw", Section::PreChorus),
    line(35.0, "Walang iwanan, pangako'y totoo", Section::PreChorus),
    line(40.0, "Ikaw ang ilaw sa dilim ko", Section::Chorus),
    line(45.0, "Gabing malamlam ay lumiwanag", Section::Chorus),
    line(50.0, "Puso ko'y sayo nang nakaukit", Section::Chorus),
    line(55.0, "Walang hanggan ang ating pag-ibig", Section::Chorus),
    line(65.0, "Minsan dala'y problema at luha", Section::Verse),
    line(70.0, "Ngunit sa'yo ako'y bumabangon pa", Section::Verse),
    line(75.0, "Ang yakap mo'y tila himig ng hangin", Section::Verse),
    line(80.0, "Na nagpapawi sa pangungulila", Section::Verse),
    line(85.0, "Walang bagyo't unos ang pipigil sa'tin", Section::PreChorus),
    line(90.0, "Basta magkasama, lahat kayang lampasan", Section::PreChorus),
    line(95.0, "Ikaw ang ilaw sa dilim ko", Section::Chorus),
    line(100.0, "Gabing malamlam ay lumiwanag", Section::Chorus),
    line(105.0, "Puso ko'y sayo nang nakaukit", Section::Chorus),
    line(110.0, "Walang hanggan ang ating pag-ibig", Section::Chorus),
    line(120.0, "Mga pangarap natin sabay lalakbayin", Section::Bridge),
    line(125.0, "Sa bawat hakbang, pag-ibig ang sandigan", Section::Bridge),
    line(130.0, "Ikaw ang ilaw sa dilim ko", Section::Chorus),
    line(135.0, "Gabing malamlam ay lumiwanag", Section::Chorus),
    line(140.0, "Puso ko'y sayo nang nakaukit", Section::Chorus),
    line(145.0, "Walang hanggan ang ating pag-ibig", Section::Chorus),
    line(150.0, "Walang hanggan…", Section::Outro),
    line(155.0, "Ikaw at ako, hanggang sa wakas", Section::Outro),
    line(160.0, "Tunay na pag-ibig, tayo'y iisa", Section::Outro),
];

/// Read-only view over an ordered lyric table.
#[derive(Debug, Clone, Copy)]
pub struct LyricTable {
    lines: &'static [LyricLine],
}

impl LyricTable {
    pub const fn new(lines: &'static [LyricLine]) -> Self {
        Self { lines }
    }

    /// The compiled-in song.
    pub fn builtin() -> Self {
        Self::new(&ILAW_NG_PAG_IBIG)
    }

    pub fn lines(&self) -> &'static [LyricLine] {
        self.lines
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&'static LyricLine> {
        self.lines.get(index)
    }

    /// Whether `time` never decreases along the table. Ties are allowed.
    pub fn is_sorted(&self) -> bool {
        self.lines.windows(2).all(|pair| pair[0].time <= pair[1].time)
    }
}

impl Default for LyricTable {
    fn default() -> Self {
        Self::builtin()
    }
}
