use crate::homes::store::Home;

pub const PAGE_SIZE: usize = 15;

pub const SYNTAX_HELP: &str = "/home \"name\" Start the teleport to your home\n\
/home list Shows a list of your homes\n\
/home add \"name\" Add a home to your homelist\n\
/home remove \"name\" Removes a home from your homelist";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageControl {
    pub label: &'static str,
    pub action: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HomeEntry {
    pub label: String,
    pub teleport: PageControl,
    pub delete: PageControl,
}

/// One rendered page of the home list UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HomePage {
    pub index: usize,
    pub page_count: usize,
    pub total: usize,
    pub entries: Vec<HomeEntry>,
    pub previous: Option<PageControl>,
    pub next: Option<PageControl>,
    pub add: PageControl,
    pub close: PageControl,
}

pub fn page_count(total: usize, page_size: usize) -> usize {
    let page_size = page_size.max(1);
    total.div_ceil(page_size).max(1)
}

/// Build page `index`, clamped to the last page.
pub fn build_page(homes: &[Home], index: usize, page_size: usize) -> HomePage {
    let page_size = page_size.max(1);
    let pages = page_count(homes.len(), page_size);
    let index = index.min(pages - 1);
    let entries = homes
        .iter()
        .skip(index * page_size)
        .take(page_size)
        .map(|home| HomeEntry {
            label: format!("Home {}", home.name),
            teleport: PageControl {
                label: "Teleport",
                action: action_line(&["teleport", quote_arg(&home.name).as_str()]),
            },
            delete: PageControl {
                label: "Delete",
                action: action_line(&["remove", quote_arg(&home.name).as_str()]),
            },
        })
        .collect();
    let previous = (index > 0).then(|| PageControl {
        label: "< Previous",
        action: action_line(&["index", (index - 1).to_string().as_str()]),
    });
    let next = (homes.len().saturating_sub(index * page_size) > page_size).then(|| PageControl {
        label: "Next >",
        action: action_line(&["index", (index + 1).to_string().as_str()]),
    });
    HomePage {
        index,
        page_count: pages,
        total: homes.len(),
        entries,
        previous,
        next,
        add: PageControl {
            label: "Add Home",
            action: action_line(&["add"]),
        },
        close: PageControl {
            label: "Close Homes",
            action: action_line(&["close"]),
        },
    }
}

/// Chat rendering of `/home list`.
pub fn chat_listing(homes: &[Home]) -> String {
    if homes.is_empty() {
        return "You dont have any homes, you can add them with /home add \"name\"".to_string();
    }
    let mut text = String::from("Your home(s):");
    for home in homes {
        text.push_str("\n - ");
        text.push_str(&home.name);
    }
    text
}

/// Name used by the UI "Add Home" button: the lowest unused positive number.
pub fn next_default_name(homes: &[Home]) -> String {
    (1..)
        .map(|n: usize| n.to_string())
        .find(|candidate| homes.iter().all(|home| &home.name != candidate))
        .unwrap_or_else(|| "1".to_string())
}

fn action_line(args: &[&str]) -> String {
    let mut line = String::from("teleport home");
    for arg in args {
        line.push(' ');
        line.push_str(arg);
    }
    line
}

fn quote_arg(value: &str) -> String {
    if value.chars().any(|c| c.is_whitespace() || c == '"') || value.is_empty() {
        format!(
            "\"{}\"",
            value.replace('\\', "\\\\").replace('"', "\\\"")
        )
    } else {
        value.to_string()
    }
}
