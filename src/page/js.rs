//! Fixed JS functions evaluated in the page.
//!
//! Each snippet is a single function expression taking one JSON argument
//! and returning a JSON value; the Rust side serializes the argument and
//! never assembles code conditionally. Elements found during the scan are
//! parked in a registry on the top window (`window.__codefill`) so later
//! operations can address them without re-querying.

/// Ensures the registry exists. Evaluated once after attach.
pub const INIT_REGISTRY: &str = r#"() => {
    window.__codefill = window.__codefill || { cand: {}, bound: {}, picked: null, pickCleanup: null, seq: 0 };
    return true;
}"#;

/// Probes one frame by index path. Cross-origin access throws inside the
/// try block and maps to { reachable: false }, which is normal control
/// flow, not an error. Reachable documents get a stable identity token so
/// the walk can de-duplicate them.
pub const PROBE_FRAME: &str = r#"(arg) => {
    const reg = window.__codefill;
    try {
        let w = window;
        for (const i of arg.path) w = w.frames[i];
        const d = w.document;
        if (!d.__codefillDocId) { d.__codefillDocId = ++reg.seq; }
        return { reachable: true, docId: d.__codefillDocId, childCount: w.frames.length };
    } catch (e) {
        return { reachable: false, docId: 0, childCount: 0 };
    }
}"#;

/// Evaluates the role rules against one frame's document. Rules run in
/// priority order per role and short-circuit on the first match. Matches
/// are parked under `role:path` in the registry; the returned tier is 0
/// when the role found nothing in this frame.
pub const SCAN_FRAME: &str = r#"(arg) => {
    const reg = window.__codefill;
    let w = window;
    try { for (const i of arg.path) w = w.frames[i]; void w.document; }
    catch (e) { return { image: 0, input: 0, submit: 0 }; }
    const d = w.document;
    const key = arg.path.join('.');
    const ci = (s) => (s || '').toLowerCase();
    const result = { image: 0, input: 0, submit: 0 };
    const park = (role, el, tier) => { reg.cand[role + ':' + key] = el; result[role] = tier; };

    {
        const imgs = Array.from(d.querySelectorAll('img, canvas'));
        let tier = 1;
        let hit = imgs.find(el => arg.imageKeywords.some(k => ci(el.id) === k));
        if (!hit) {
            tier = 2;
            hit = imgs.find(el => arg.imageKeywords.some(k =>
                ci(el.id).includes(k) || ci(el.getAttribute('src')).includes(k)));
        }
        if (!hit && imgs.length === 1) { tier = 3; hit = imgs[0]; }
        if (hit) park('image', hit, tier);
    }
    {
        const inputs = Array.from(d.querySelectorAll('input'))
            .filter(el => ['', 'text', 'search', 'tel'].includes(ci(el.type)));
        let tier = 1;
        let hit = inputs.find(el => arg.inputKeywords.some(k => ci(el.id) === k || ci(el.name) === k));
        if (!hit) {
            tier = 2;
            hit = inputs.find(el => arg.inputKeywords.some(k =>
                ci(el.id).includes(k) || ci(el.name).includes(k) || ci(el.placeholder).includes(k)));
        }
        if (!hit) {
            tier = 3;
            hit = inputs.find(el => el.maxLength >= 3 && el.maxLength <= 10);
        }
        if (hit) park('input', hit, tier);
    }
    {
        const controls = Array.from(d.querySelectorAll('input[type=submit], input[type=button], button'));
        let tier = 1;
        let hit = controls.find(el => arg.submitKeywords.some(k => ci(el.id) === k));
        if (!hit) {
            tier = 2;
            hit = controls.find(el => arg.submitKeywords.some(k =>
                ci(el.id).includes(k) || ci(el.value).includes(k) || ci(el.textContent).includes(k)));
        }
        if (!hit) { tier = 3; hit = controls.find(el => ci(el.type) === 'submit'); }
        if (hit) park('submit', hit, tier);
    }
    return result;
}"#;

/// Promotes the winning candidate for a role to the bound slot and drops
/// the rest.
pub const COMMIT_CANDIDATE: &str = r#"(arg) => {
    const reg = window.__codefill;
    const el = reg.cand[arg.role + ':' + arg.path.join('.')];
    if (!el) return false;
    reg.bound[arg.role] = el;
    for (const k of Object.keys(reg.cand)) {
        if (k.startsWith(arg.role + ':')) delete reg.cand[k];
    }
    return true;
}"#;

/// Installs the manual-selection listener on every reachable frame's
/// document, capture phase. The first pointer-down or click anywhere is
/// swallowed (no default action, no propagation) and its target parked as
/// the picked element; the listeners remove themselves.
pub const INSTALL_PICKER: &str = r#"(arg) => {
    const reg = window.__codefill;
    if (reg.pickCleanup) return true;
    reg.picked = null;
    const cleanups = [];
    const cleanup = () => { for (const c of cleanups) c(); reg.pickCleanup = null; };
    const handler = (e) => { e.preventDefault(); e.stopPropagation(); reg.picked = e.target; cleanup(); };
    for (const path of arg.paths) {
        try {
            let w = window;
            for (const i of path) w = w.frames[i];
            const d = w.document;
            d.addEventListener('pointerdown', handler, true);
            d.addEventListener('click', handler, true);
            cleanups.push(() => {
                d.removeEventListener('pointerdown', handler, true);
                d.removeEventListener('click', handler, true);
            });
        } catch (e) { }
    }
    reg.pickCleanup = cleanup;
    return true;
}"#;

pub const POLL_PICK: &str = r#"() => !!window.__codefill.picked"#;

pub const BIND_PICK: &str = r#"(arg) => {
    const reg = window.__codefill;
    if (!reg.picked) return false;
    reg.bound[arg.role] = reg.picked;
    reg.picked = null;
    return true;
}"#;

pub const REMOVE_PICKER: &str = r#"() => {
    const reg = window.__codefill;
    if (reg.pickCleanup) reg.pickCleanup();
    reg.picked = null;
    return true;
}"#;

/// Whether the bound image has finished loading. Canvases are always ready.
pub const IMAGE_READY: &str = r#"() => {
    const el = window.__codefill.bound.image;
    if (!el) return false;
    if (el.tagName.toLowerCase() === 'canvas') return true;
    return el.complete === true;
}"#;

/// Renders the bound image into a working canvas at natural size with
/// smoothing disabled and ships it out as a PNG data URL. A cross-origin
/// source taints the canvas and `toDataURL` throws a security error; that
/// surfaces as { ok: false } with the error name.
pub const EXTRACT_IMAGE: &str = r#"() => {
    const el = window.__codefill.bound.image;
    try {
        let canvas;
        if (el.tagName.toLowerCase() === 'canvas') {
            canvas = el;
        } else {
            canvas = el.ownerDocument.createElement('canvas');
            canvas.width = el.naturalWidth || el.width;
            canvas.height = el.naturalHeight || el.height;
            const ctx = canvas.getContext('2d');
            ctx.imageSmoothingEnabled = false;
            ctx.drawImage(el, 0, 0);
        }
        return { ok: true, data: canvas.toDataURL('image/png'), error: '' };
    } catch (e) {
        return { ok: false, data: '', error: String((e && e.name) || e) };
    }
}"#;

/// Probes the target document for the legacy DOM helper.
pub const HAS_HELPER: &str = r#"() => {
    const el = window.__codefill.bound.input;
    const w = el.ownerDocument.defaultView;
    return !!(w.jQuery && w.jQuery.fn);
}"#;

pub const FOCUS_INPUT: &str = r#"() => {
    window.__codefill.bound.input.focus();
    return true;
}"#;

/// Writes through the value setter inherited from the element realm's
/// HTMLInputElement.prototype. An instance-level override installed by the
/// page (or a framework's value tracker shadowing the property) is
/// bypassed, so the displayed value changes regardless.
pub const SET_VALUE_NATIVE: &str = r#"(arg) => {
    const el = window.__codefill.bound.input;
    const w = el.ownerDocument.defaultView;
    const desc = w.Object.getOwnPropertyDescriptor(w.HTMLInputElement.prototype, 'value');
    desc.set.call(el, arg.text);
    return true;
}"#;

/// Routes the write through the legacy helper's own value and event APIs.
pub const SET_VALUE_HELPER: &str = r#"(arg) => {
    const el = window.__codefill.bound.input;
    const w = el.ownerDocument.defaultView;
    w.jQuery(el).val(arg.text).trigger('input').trigger('change');
    return true;
}"#;

/// Last-resort signal for logic that inspects attributes, not live values.
pub const SET_ATTRIBUTE: &str = r#"(arg) => {
    window.__codefill.bound.input.setAttribute('value', arg.text);
    return true;
}"#;

/// Bubbling notification burst in fixed order: input, keydown, keyup,
/// change, blur. Delegated listeners on ancestors observe all of them.
pub const DISPATCH_EVENTS: &str = r#"() => {
    const el = window.__codefill.bound.input;
    const w = el.ownerDocument.defaultView;
    el.dispatchEvent(new w.Event('input', { bubbles: true }));
    el.dispatchEvent(new w.KeyboardEvent('keydown', { bubbles: true }));
    el.dispatchEvent(new w.KeyboardEvent('keyup', { bubbles: true }));
    el.dispatchEvent(new w.Event('change', { bubbles: true }));
    el.dispatchEvent(new w.Event('blur', { bubbles: true }));
    return true;
}"#;

/// Appends one character through the native setter, framed by key events.
pub const TYPE_CHAR: &str = r#"(arg) => {
    const el = window.__codefill.bound.input;
    const w = el.ownerDocument.defaultView;
    const desc = w.Object.getOwnPropertyDescriptor(w.HTMLInputElement.prototype, 'value');
    el.dispatchEvent(new w.KeyboardEvent('keydown', { key: arg.ch, bubbles: true }));
    desc.set.call(el, desc.get.call(el) + arg.ch);
    el.dispatchEvent(new w.Event('input', { bubbles: true }));
    el.dispatchEvent(new w.KeyboardEvent('keyup', { key: arg.ch, bubbles: true }));
    return true;
}"#;

pub const HIGHLIGHT_INPUT: &str = r#"() => {
    const el = window.__codefill.bound.input;
    el.style.backgroundColor = '#f5f3ff';
    el.style.border = '2px solid #8b5cf6';
    return true;
}"#;

/// Activates the bound submit control. Returns false when none is bound.
pub const ACTIVATE_SUBMIT: &str = r#"() => {
    const el = window.__codefill.bound.submit;
    if (!el) return false;
    el.click();
    return true;
}"#;

/// Enter key burst on the input, for hosts without a discrete submit.
pub const PRESS_ENTER: &str = r#"() => {
    const el = window.__codefill.bound.input;
    const w = el.ownerDocument.defaultView;
    for (const type of ['keydown', 'keypress', 'keyup']) {
        el.dispatchEvent(new w.KeyboardEvent(type, { key: 'Enter', keyCode: 13, bubbles: true }));
    }
    return true;
}"#;

/// Creates or updates the status overlay in the top document.
pub const HUD_UPDATE: &str = r#"(arg) => {
    const ID = 'codefill-hud';
    const d = document;
    if (!d.getElementById('codefill-hud-style')) {
        const style = d.createElement('style');
        style.id = 'codefill-hud-style';
        style.innerHTML = '@keyframes codefill-spin { to { transform: rotate(360deg); } }';
        d.head.appendChild(style);
    }
    let hud = d.getElementById(ID);
    if (!hud) {
        hud = d.createElement('div');
        hud.id = ID;
        hud.style.cssText = 'position:fixed;top:10px;left:50%;transform:translateX(-50%);' +
            'z-index:9999999;background:#0f172a;padding:10px 20px;border-radius:12px;' +
            'font-family:sans-serif;font-size:12px;font-weight:bold;' +
            'box-shadow:0 10px 15px -3px rgba(0,0,0,0.4);display:flex;align-items:center;gap:12px;';
        d.body.appendChild(hud);
    }
    hud.style.color = arg.error ? '#fca5a5' : '#a78bfa';
    hud.style.border = arg.error ? '1px solid #b91c1c' : '1px solid #5b21b6';
    const spinner = arg.error ? '' :
        '<div style="width:12px;height:12px;border:2px solid #a78bfa;border-top-color:transparent;' +
        'border-radius:50%;animation:codefill-spin 1s linear infinite;"></div>';
    hud.innerHTML = spinner + arg.text + ' (' + Math.round(arg.progress * 100) + '%)';
    return true;
}"#;

pub const HUD_REMOVE: &str = r#"() => {
    const hud = document.getElementById('codefill-hud');
    if (hud) hud.remove();
    return true;
}"#;
