//! In-page locator resolver
//!
//! Compiles a [`Query`] into one self-contained script for a single
//! `Runtime.evaluate`. Resolution, actionability checks and the action itself
//! run in the same synchronous task, so the page cannot re-render between
//! locating an element and interacting with it.

use super::Query;
use crate::Result;

/// Replaced by the serialized query in [`query_script`]
const REQUEST_PLACEHOLDER: &str = "__CHASER_REQUEST__";

/// Resolver runtime
///
/// - role selectors only consider rendered elements; an explicit `role`
///   attribute wins over the implicit role of the tag
/// - label selectors match `aria-label`, `aria-labelledby` and the associated `<label>`
/// - text selectors keep only the innermost matching elements
/// - any op except `count` on a `Pick::All` locator with several matches reports `ambiguous`
pub const RESOLVER_SCRIPT: &str = r#"
(() => {
    const request = __CHASER_REQUEST__;

    const norm = (s) => (s || '').replace(/\s+/g, ' ').trim();

    const matchText = (m, raw) => {
        const text = norm(raw);
        if (m.kind === 'exact') return text === norm(m.value);
        if (m.kind === 'substring') return text.toLowerCase().includes(norm(m.value).toLowerCase());
        return new RegExp(m.value, m.case_insensitive ? 'i' : '').test(text);
    };

    const isVisible = (el) => {
        if (!el.isConnected) return false;
        const style = window.getComputedStyle(el);
        if (style.visibility === 'hidden' || style.display === 'none') return false;
        const rect = el.getBoundingClientRect();
        return rect.width > 0 && rect.height > 0;
    };

    const roleOf = (el) => {
        const explicit = el.getAttribute('role');
        if (explicit) return explicit.trim().split(/\s+/)[0];
        const tag = el.tagName.toLowerCase();
        if (/^h[1-6]$/.test(tag)) return 'heading';
        switch (tag) {
            case 'a':
            case 'area':
                return el.hasAttribute('href') ? 'link' : null;
            case 'button': return 'button';
            case 'select': return (el.multiple || el.size > 1) ? 'listbox' : 'combobox';
            case 'textarea': return 'textbox';
            case 'nav': return 'navigation';
            case 'img': return el.getAttribute('alt') === '' ? null : 'img';
            case 'td': return 'cell';
            case 'th': return 'columnheader';
            case 'ul':
            case 'ol':
                return 'list';
            case 'li': return 'listitem';
            case 'option': return 'option';
            case 'dialog': return 'dialog';
            case 'input': {
                const type = (el.getAttribute('type') || 'text').toLowerCase();
                if (['button', 'submit', 'reset', 'image'].includes(type)) return 'button';
                if (type === 'checkbox' || type === 'radio') return type;
                if (type === 'search') return el.hasAttribute('list') ? 'combobox' : 'searchbox';
                if (type === 'hidden') return null;
                return 'textbox';
            }
        }
        return null;
    };

    const headingLevel = (el) => {
        const m = /^h([1-6])$/i.exec(el.tagName);
        if (m) return Number(m[1]);
        const level = el.getAttribute('aria-level');
        return level ? Number(level) : null;
    };

    const labelsOf = (el) => {
        const out = [];
        const aria = el.getAttribute('aria-label');
        if (aria) out.push(aria);
        const by = el.getAttribute('aria-labelledby');
        if (by) {
            by.split(/\s+/).forEach((id) => {
                const ref = document.getElementById(id);
                if (ref) out.push(ref.textContent);
            });
        }
        if (el.labels) Array.from(el.labels).forEach((label) => out.push(label.textContent));
        return out;
    };

    const accessibleName = (el) => {
        const labels = labelsOf(el);
        if (labels.length) return labels.join(' ');
        const tag = el.tagName.toLowerCase();
        if (tag === 'img') return el.getAttribute('alt') || '';
        if (tag === 'input') {
            const type = (el.getAttribute('type') || 'text').toLowerCase();
            if (['button', 'submit', 'reset'].includes(type)) return el.value || '';
            return el.getAttribute('placeholder') || el.getAttribute('title') || '';
        }
        if (tag === 'select' || tag === 'textarea') return el.getAttribute('title') || '';
        return el.textContent || el.getAttribute('title') || '';
    };

    const SKIP = new Set(['SCRIPT', 'STYLE', 'NOSCRIPT', 'TEMPLATE', 'HEAD', 'TITLE']);
    const descendants = (root) =>
        Array.from(root.querySelectorAll('*')).filter((el) => !SKIP.has(el.tagName));

    const candidates = (root, sel) => {
        switch (sel.kind) {
            case 'css':
                return Array.from(root.querySelectorAll(sel.css));
            case 'role':
                return descendants(root).filter((el) =>
                    roleOf(el) === sel.role && isVisible(el)
                    && (sel.level == null || headingLevel(el) === sel.level)
                    && (sel.name == null || matchText(sel.name, accessibleName(el))));
            case 'label':
                return descendants(root).filter((el) => labelsOf(el).some((l) => matchText(sel.text, l)));
            case 'text': {
                const hits = descendants(root).filter((el) => matchText(sel.text, el.textContent));
                return hits.filter((el) => !hits.some((other) => other !== el && el.contains(other)));
            }
        }
        return [];
    };

    const resolve = (loc) => {
        const roots = loc.scope ? resolve(loc.scope) : [document];
        let found = [];
        for (const root of roots) {
            for (const el of candidates(root, loc.selector)) {
                if (!found.includes(el)) found.push(el);
            }
        }
        if (roots.length > 1) {
            found.sort((a, b) => (a.compareDocumentPosition(b) & Node.DOCUMENT_POSITION_FOLLOWING) ? -1 : 1);
        }
        for (const f of loc.filters || []) {
            const keep = f.kind === 'has_text';
            found = found.filter((el) => matchText(f.text, el.textContent) === keep);
        }
        switch (loc.pick.kind) {
            case 'first': return found.slice(0, 1);
            case 'last': return found.slice(-1);
            case 'nth': return found.slice(loc.pick.index, loc.pick.index + 1);
            default: return found;
        }
    };

    const fire = (el, type) => el.dispatchEvent(new Event(type, { bubbles: true }));

    const run = ({ locator, op }) => {
        const els = resolve(locator);
        if (op.kind === 'count') return { status: 'count', value: els.length };
        if (els.length > 1) return { status: 'ambiguous', count: els.length };

        const el = els[0];
        if (op.kind === 'visible') return { status: 'visible', value: !!el && isVisible(el) };
        if (!el) return { status: 'missing' };
        if (op.kind === 'text') return { status: 'text', value: el.textContent || '' };
        if (op.kind === 'attribute') return { status: 'attribute', value: el.getAttribute(op.name) };

        if (!isVisible(el)) return { status: 'hidden' };
        if (el.disabled || el.getAttribute('aria-disabled') === 'true') return { status: 'disabled' };

        switch (op.kind) {
            case 'click':
                el.click();
                return { status: 'done' };
            case 'fill': {
                el.focus();
                const proto = el instanceof HTMLTextAreaElement ? HTMLTextAreaElement.prototype
                    : el instanceof HTMLInputElement ? HTMLInputElement.prototype : null;
                const descriptor = proto && Object.getOwnPropertyDescriptor(proto, 'value');
                if (descriptor && descriptor.set) descriptor.set.call(el, op.value);
                else el.value = op.value;
                fire(el, 'input');
                fire(el, 'change');
                return { status: 'done' };
            }
            case 'select_option': {
                const options = Array.from(el.options || []);
                const label = (o) => norm(o.label || o.textContent);
                const option = options.find((o) => label(o) === norm(op.label));
                if (!option) return { status: 'no_such_option', available: options.map(label) };
                el.value = option.value;
                option.selected = true;
                fire(el, 'input');
                fire(el, 'change');
                return { status: 'done' };
            }
        }
        return { status: 'missing' };
    };

    return JSON.stringify(run(request));
})()
"#;

/// Script for one query; it evaluates to a `QueryResult` serialized as a JSON string
pub fn query_script(query: &Query<'_>) -> Result<String> {
    let request = serde_json::to_string(query)?;
    Ok(RESOLVER_SCRIPT.replace(REQUEST_PLACEHOLDER, &request))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::locator::{ElementOp, Locator, Role, TextMatch};

    #[test]
    fn test_query_script_embeds_request_once() {
        let locator = Locator::role(Role::Link).name_exact("Motors").first();
        let op = ElementOp::Click;
        let script = query_script(&Query { locator: &locator, op: &op }).unwrap();

        assert!(!script.contains(REQUEST_PLACEHOLDER));
        assert!(script.contains(r#""op":{"kind":"click"}"#));
        assert!(script.contains(r#""role":"link""#));
        assert!(script.contains(r#""value":"Motors""#));
        assert!(script.trim_end().ends_with("})()"));
    }

    #[test]
    fn test_query_script_keeps_quotes_inside_json() {
        let locator = Locator::text(TextMatch::exact("Agent's \"details\""));
        let op = ElementOp::Visible;
        let script = query_script(&Query { locator: &locator, op: &op }).unwrap();
        assert!(script.contains(r#""value":"Agent's \"details\"""#));
    }

    #[test]
    fn test_resolver_has_no_separate_scroll_step() {
        assert!(!RESOLVER_SCRIPT.contains("scrollIntoView"));
        assert!(!RESOLVER_SCRIPT.contains("scrollTo"));
    }
}
