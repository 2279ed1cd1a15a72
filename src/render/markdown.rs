//! Just enough markdown to lay out written answers: headings, bullets,
//! fenced code and paragraphs. Inline markup is dropped.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Style {
    Body,
    Heading(u8),
    Bullet,
    Code,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    Text { style: Style, text: String },
    Gap,
}

pub fn parse(source: &str) -> Vec<Block> {
    let mut blocks = Vec::new();
    let mut paragraph: Vec<&str> = Vec::new();
    let mut in_fence = false;

    fn flush(paragraph: &mut Vec<&str>, blocks: &mut Vec<Block>) {
        if !paragraph.is_empty() {
            blocks.push(Block::Text {
                style: Style::Body,
                text: strip_inline(&paragraph.join(" ")),
            });
            paragraph.clear();
        }
    }

    for line in source.lines() {
        let trimmed = line.trim();

        if trimmed.starts_with("```") || trimmed.starts_with("~~~") {
            flush(&mut paragraph, &mut blocks);
            in_fence = !in_fence;
            continue;
        }
        if in_fence {
            blocks.push(Block::Text {
                style: Style::Code,
                text: line.replace('\t', "    "),
            });
            continue;
        }

        if trimmed.is_empty() {
            flush(&mut paragraph, &mut blocks);
            if blocks.last().is_some_and(|b| *b != Block::Gap) {
                blocks.push(Block::Gap);
            }
        } else if let Some((level, text)) = heading(trimmed) {
            flush(&mut paragraph, &mut blocks);
            blocks.push(Block::Text {
                style: Style::Heading(level),
                text: strip_inline(text),
            });
        } else if let Some(item) = bullet(trimmed) {
            flush(&mut paragraph, &mut blocks);
            blocks.push(Block::Text {
                style: Style::Bullet,
                text: format!("\u{2022} {}", strip_inline(item)),
            });
        } else {
            paragraph.push(trimmed);
        }
    }
    flush(&mut paragraph, &mut blocks);

    if blocks.last() == Some(&Block::Gap) {
        blocks.pop();
    }
    blocks
}

fn heading(line: &str) -> Option<(u8, &str)> {
    let level = line.chars().take_while(|&c| c == '#').count();
    if level == 0 || level > 6 {
        return None;
    }
    let rest = &line[level..];
    if !rest.is_empty() && !rest.starts_with(' ') {
        return None;
    }
    Some((level as u8, rest.trim()))
}

fn bullet(line: &str) -> Option<&str> {
    ["- ", "* ", "+ "]
        .iter()
        .find_map(|marker| line.strip_prefix(marker))
}

fn strip_inline(text: &str) -> String {
    text.replace("**", "").replace("__", "").replace('`', "")
}
