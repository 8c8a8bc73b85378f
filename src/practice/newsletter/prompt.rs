//! Prompt text for the newsletter steps

use crate::practice::tools::Article;
use crate::practice::types::Language;

pub fn generate_themes(language: Language, sub_theme_count: usize) -> String {
    format!(
        "You are an expert helping to create a newsletter. Based on a list of article titles provided, \
your task is to choose a single, specific newsletter theme framed as a clear, detailed question that grabs the reader's attention.

In addition, generate {count} sub-themes that are highly specific, researchable news items or insights under the main theme. \
Ensure these sub-themes reflect the latest trends in the field and frame them as compelling news topics.

The output should be formatted as:
- Main theme (in question form)
- {count} sub-themes (detailed and focused on emerging trends, technologies, or insights).

The sub-themes should create a clear direction for the newsletter, avoiding broad, generic topics.
All your output should be in {language}",
        count = sub_theme_count,
        language = language,
    )
}

pub fn article_titles(titles: &[String]) -> String {
    format!("Article titles: \n\n {}", titles.join("\n"))
}

/// Reference block for one sub-theme's articles
pub fn article_references(articles: &[Article]) -> String {
    articles
        .iter()
        .map(|article| {
            let image = article
                .image_url
                .as_deref()
                .map(|url| format!("![Article Image]({})\n", url))
                .unwrap_or_default();
            format!(
                "Title: {}\n{}Content: {}...",
                article.title, image, article.raw_content
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn write_section(sub_theme: &str, article_references: &str, language: Language) -> String {
    format!(
        "Write a newsletter section for the sub-theme: \"{sub_theme}\".

Use the following articles as reference and include relevant points from their titles, images, and content:
<article>
{article_references}
<article/>

When referencing images in your writing, use proper markdown image syntax: ![Image Description](image_url)

Summarize the key points and trends related to this sub-theme, and reference the images where they add value to the discussion.
Keep the tone engaging and informative for newsletter readers. You should write in {language}"
    )
}

pub fn edit_newsletter(theme: &str, draft: &str, language: Language) -> String {
    format!(
        "As an expert editor, review and refine the following newsletter on the theme: {theme}

{draft}

Please ensure:
0. The title is in question form. Subtitles may be questions or plain sentences.
1. Consistent tone and style throughout the newsletter
2. Smooth transitions between sections
3. Proper formatting and structure
4. Clear and engaging language
5. No grammatical or spelling errors

Provide the edited version of the newsletter in {language}."
    )
}
