//! Generic CSS selector lists for product pages.
//!
//! Each list is tried in order and the first selector with a match wins, so
//! the most specific selectors (microdata, well-known ids) go first and broad
//! class-name guesses go last.
//!
//! **Update process**: when a retailer slips through, capture an HTML sample,
//! add the selector here, and add a fixture under `tests/fixtures/`.

/// Product title.
pub const TITLE: &[&str] = &[
    "[itemprop='name']",
    "h1.product-title",
    "h1.product_title",
    "h1.product-name",
    ".product-title h1",
    ".product-name h1",
    "[data-testid='product-title']",
    "[class*='product-title']",
    "[class*='productTitle']",
    "[class*='product-name']",
    "h1",
];

/// Current price.
pub const PRICE: &[&str] = &[
    "[itemprop='price']",
    "[data-testid='price']",
    ".product-price .price",
    ".price--sale",
    ".sale-price",
    ".special-price .price",
    ".price-item--sale",
    ".current-price",
    ".product-price",
    "[class*='product-price']",
    "[class*='productPrice']",
    "[class*='price-current']",
    ".price",
    "[class*='price']",
];

/// Price before discount.
pub const ORIGINAL_PRICE: &[&str] = &[
    ".old-price .price",
    ".price--compare",
    ".compare-at-price",
    ".price-item--regular",
    ".original-price",
    ".regular-price",
    ".was-price",
    ".price del",
    "del .amount",
    "del",
    "s.price",
    "[class*='old-price']",
    "[class*='original-price']",
];

/// Main product image.
pub const IMAGE: &[&str] = &[
    "[itemprop='image']",
    ".product-image img",
    ".product__media img",
    ".product-gallery img",
    ".woocommerce-product-gallery__image img",
    ".gallery-placeholder img",
    "[class*='product-image'] img",
    "[class*='productImage'] img",
    "[class*='gallery'] img",
];

/// Product description.
pub const DESCRIPTION: &[&str] = &[
    "[itemprop='description']",
    ".product-description",
    ".product__description",
    ".woocommerce-product-details__short-description",
    "#description",
    "[class*='product-description']",
    "[class*='description']",
];

/// Stock keeping unit.
pub const SKU: &[&str] = &[
    "[itemprop='sku']",
    "[itemprop='mpn']",
    ".sku",
    ".product-sku",
    "[data-sku]",
    "[class*='sku']",
];

/// Stock status.
pub const AVAILABILITY: &[&str] = &[
    "[itemprop='availability']",
    ".stock",
    ".availability",
    ".product-availability",
    "[class*='stock-status']",
    "[class*='availability']",
];

/// Brand or manufacturer.
pub const BRAND: &[&str] = &[
    "[itemprop='brand'] [itemprop='name']",
    "[itemprop='brand']",
    ".product-brand",
    ".brand",
    "[class*='product-brand']",
    "[class*='brand-name']",
];

/// Image galleries, used as a weak product-page signal.
pub const GALLERY: &[&str] = &[
    ".product-gallery",
    ".product__media",
    ".product-images",
    ".woocommerce-product-gallery",
    ".gallery-placeholder",
    "[class*='product-gallery']",
    "[class*='carousel'] img",
    "[class*='thumbnail'] img",
];

/// Add-to-cart forms and buttons.
pub const ADD_TO_CART: &[&str] = &[
    "form[action*='/cart/add']",
    "form.cart",
    "#add-to-cart-button",
    "#addToCart",
    "button[name='add-to-cart']",
    "button[name='add']",
    "[data-testid='add-to-cart']",
    "[data-action='add-to-cart']",
    ".single_add_to_cart_button",
    ".add-to-cart",
    ".add_to_cart_button",
    "#product-addtocart-button",
    "[class*='add-to-cart']",
    "[class*='addToCart']",
    "[class*='add-to-basket']",
];

/// Elements whose text may name an add-to-cart action.
pub const BUTTONS: &[&str] = &["button, input[type='submit'], a[role='button'], [role='button']"];

/// Localized add-to-cart wording, lower-case.
pub const ADD_TO_CART_TEXT: &[&str] = &[
    "add to cart",
    "add to bag",
    "add to basket",
    "buy now",
    "sepete ekle",
    "hemen al",
    "in den warenkorb",
    "ajouter au panier",
    "aggiungi al carrello",
    "añadir a la cesta",
    "añadir al carrito",
    "in winkelwagen",
    "dodaj do koszyka",
];

/// Colour pickers: swatches first, then dropdowns.
pub const VARIANT_COLORS: &[&str] = &[
    "[data-option-name*='olor'] [data-value]",
    "[class*='color-swatch'] [data-value]",
    "[class*='colour-swatch'] [data-value]",
    "[class*='swatch'][class*='color'] li",
    "[class*='color-selector'] li",
    "[class*='color-selector'] button",
    "[class*='color-options'] li",
    "[class*='color-options'] button",
    "select[name*='color'] option",
    "select[name*='colour'] option",
    "select[id*='color'] option",
    "input[type='radio'][name*='color']",
    "input[type='radio'][name*='Color']",
];

/// Size pickers.
pub const VARIANT_SIZES: &[&str] = &[
    "[data-option-name*='ize'] [data-value]",
    "[class*='size-swatch'] [data-value]",
    "[class*='size-selector'] li",
    "[class*='size-selector'] button",
    "[class*='size-options'] li",
    "[class*='size-options'] button",
    "[class*='sizes'] li",
    "select[name*='size'] option",
    "select[id*='size'] option",
    "input[type='radio'][name*='size']",
    "input[type='radio'][name*='Size']",
];

/// Any other option picker (material, capacity, ...).
pub const VARIANT_OTHER: &[&str] = &[
    "[class*='variant-selector'] option",
    "[class*='product-options'] select option",
    ".variations select option",
    "select[name*='option'] option",
    "select[data-attribute_name] option",
];
