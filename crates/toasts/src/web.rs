//! Browser bindings: htmx content-load events and bootstrap toast widgets

use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::Element;

use crate::reconciler::{ToastError, ToastHost, ToastReconciler, TOAST_SELECTOR};

#[wasm_bindgen(js_namespace = htmx)]
extern "C" {
    /// `htmx.onLoad(callback)`: runs after every swap and on page load
    #[wasm_bindgen(js_name = onLoad)]
    fn htmx_on_load(callback: &js_sys::Function);

    /// `htmx.findAll(selector)`: a NodeList over the whole document
    #[wasm_bindgen(js_name = findAll)]
    fn htmx_find_all(selector: &str) -> JsValue;
}

#[wasm_bindgen(js_namespace = bootstrap)]
extern "C" {
    #[wasm_bindgen(js_name = Toast)]
    type BootstrapToast;

    #[wasm_bindgen(constructor, js_class = "Toast", catch)]
    fn new(element: &Element) -> Result<BootstrapToast, JsValue>;

    #[wasm_bindgen(method, js_class = "Toast", catch)]
    fn show(this: &BootstrapToast) -> Result<(), JsValue>;
}

fn describe(value: &JsValue) -> String {
    value.as_string().unwrap_or_else(|| format!("{:?}", value))
}

/// The live document, reached through htmx
#[derive(Debug, Default, Clone, Copy)]
pub struct HtmxDocument;

impl ToastHost for HtmxDocument {
    type Element = Element;

    fn find_toasts(&self) -> Vec<Element> {
        js_sys::Array::from(&htmx_find_all(TOAST_SELECTOR))
            .iter()
            .filter_map(|node| node.dyn_into::<Element>().ok())
            .collect()
    }

    fn has_class(&self, element: &Element, class: &str) -> bool {
        element.class_list().contains(class)
    }

    fn has_attribute(&self, element: &Element, name: &str) -> bool {
        element.has_attribute(name)
    }

    fn set_attribute(&mut self, element: &Element, name: &str, value: &str) -> Result<(), ToastError> {
        element
            .set_attribute(name, value)
            .map_err(|e| ToastError::Attribute(describe(&e)))
    }

    fn remove(&mut self, element: &Element) -> Result<(), ToastError> {
        element.remove();
        Ok(())
    }

    fn show(&mut self, element: &Element) -> Result<(), ToastError> {
        let toast = BootstrapToast::new(element).map_err(|e| ToastError::Show(describe(&e)))?;
        toast.show().map_err(|e| ToastError::Show(describe(&e)))
    }
}

/// Register the reconciler with `htmx.onLoad`. Call once per page.
#[wasm_bindgen(js_name = installToastHandler)]
pub fn install_toast_handler(show_every_load: bool) {
    let policy = if show_every_load {
        crate::ShowPolicy::EveryLoad
    } else {
        crate::ShowPolicy::Once
    };
    let reconciler = ToastReconciler::new(policy);

    let callback = Closure::<dyn FnMut(JsValue)>::new(move |_loaded: JsValue| {
        reconciler.on_content_load(&mut HtmxDocument);
    });
    htmx_on_load(callback.as_ref().unchecked_ref());
    // htmx holds the callback for the page's lifetime
    callback.forget();
}
