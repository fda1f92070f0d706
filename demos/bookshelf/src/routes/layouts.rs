//! Page chrome.

use switchyard::Layout;

pub fn layouts() -> Vec<Layout> {
    vec![
        Layout::template(
            "site",
            "<!doctype html><html><body>{{outlet}}<footer>bookshelf</footer></body></html>",
        ),
        Layout::template("catalogue", "<nav><a href=\"/books\">All books</a></nav><main>{{outlet}}</main>")
            .within("site"),
        // Terminal output has no chrome.
        Layout::new("plain", |content| format!("{content}\n")),
    ]
}
