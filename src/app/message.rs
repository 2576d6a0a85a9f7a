use super::selection::SelectedSong;

pub(crate) fn watch_url(song_id: &str) -> String {
    format!("https://www.youtube.com/watch?v={song_id}")
}

pub(crate) fn generate_message(
    theme: &str,
    reference: &str,
    verse: &str,
    songs: &[SelectedSong],
) -> String {
    let mut message = String::from(
        "Good Day Everyone! Please find the theme and worship list for this Sunday. \
         Feel free to share your thoughts and suggestions for any changes.\n\n",
    );
    message.push_str(&format!("Worship Theme: {}\n\n", theme.trim()));
    message.push_str(&format!(
        "Scripture: {}\n\"{}\"\n\n",
        reference.trim(),
        verse.trim()
    ));
    message.push_str("Song List:\n");
    for (idx, song) in songs.iter().enumerate() {
        message.push_str(&format!(
            "{}. {}\n   {}\n\n",
            idx + 1,
            song.title,
            watch_url(&song.song_id)
        ));
    }
    message
}
