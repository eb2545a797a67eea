//! Jellyfin/Kodi style episode naming and `.nfo` metadata.

/// `S01E001`
#[must_use]
pub fn episode_tag(season: u32, episode: usize) -> String {
    format!("S{season:02}E{episode:03}")
}

/// `S01E001 <file_name>`
#[must_use]
pub fn library_name(tag: &str, file_name: &str) -> String {
    format!("{tag} {file_name}")
}

#[must_use]
pub fn escape_xml(text: &str) -> String {
    let mut res = String::with_capacity(text.len());

    for c in text.chars() {
        match c {
            '&' => res.push_str("&amp;"),
            '<' => res.push_str("&lt;"),
            '>' => res.push_str("&gt;"),
            '"' => res.push_str("&quot;"),
            '\'' => res.push_str("&apos;"),
            c => res.push(c),
        }
    }

    res
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EpisodeInfo<'a> {
    pub title: &'a str,
    pub show_title: &'a str,
    pub season: u32,
    pub episode: usize,
    pub studio: &'a str,
}

impl EpisodeInfo<'_> {
    #[must_use]
    pub fn to_nfo(&self) -> String {
        format!(
            "<episodedetails>\n\
             <title>{}</title>\n\
             <showtitle>{}</showtitle>\n\
             <season>{}</season>\n\
             <episode>{}</episode>\n\
             <studio>{}</studio>\n\
             </episodedetails>",
            escape_xml(self.title),
            escape_xml(self.show_title),
            self.season,
            self.episode,
            escape_xml(self.studio),
        )
    }
}

#[must_use]
pub fn tvshow_nfo(title: &str, plot: &str) -> String {
    format!(
        "<tvshow>\n\
         <title>{}</title>\n\
         <plot>{}</plot>\n\
         </tvshow>",
        escape_xml(title),
        escape_xml(plot),
    )
}
