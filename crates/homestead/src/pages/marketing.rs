use axum::response::Html;

use crate::html::layout;

pub async fn home() -> Html<String> {
    layout(
        "Home",
        "<h1>Property management without the paperwork</h1>\n\
         <p>Homestead keeps your organizations, properties, and maintenance requests \
         in one place so nothing slips through the cracks.</p>\n\
         <ul>\n<li>Group properties under the organizations that own them.</li>\n\
         <li>Track maintenance from the first report to the final fix.</li>\n\
         <li>Give every tenant a clear channel to reach you.</li>\n</ul>\n\
         <p><a href=\"/login\">Log in</a> to get started.</p>",
    )
}

pub async fn about() -> Html<String> {
    layout(
        "About",
        "<h1>About Homestead</h1>\n\
         <p>Homestead is built by property managers for property managers. We started \
         with the chores that eat a landlord's week: keeping track of units, chasing \
         repairs, and answering the same tenant questions over and over.</p>\n\
         <p>Our goal is simple software that stays out of your way and keeps a reliable \
         record of every property you manage.</p>",
    )
}

pub async fn privacy() -> Html<String> {
    layout(
        "Privacy Policy",
        "<h1>Privacy Policy</h1>\n\
         <h2>What we collect</h2>\n\
         <p>We store the email address you sign in with, the organizations and properties \
         you create, and the maintenance requests you record.</p>\n\
         <h2>How we use it</h2>\n\
         <p>Your email address is used to send sign-in and verification codes and notices \
         about changes to your account. We do not sell your information.</p>\n\
         <h2>Cookies</h2>\n\
         <p>We use a signed session cookie to keep you signed in and a short-lived cookie \
         while an email change is being verified.</p>\n\
         <h2>Contact</h2>\n<p>Questions about this policy can be sent to privacy@homestead.local.</p>",
    )
}

pub async fn terms() -> Html<String> {
    layout(
        "Terms of Service",
        "<h1>Terms of Service</h1>\n\
         <p>By using Homestead you agree to provide accurate information about the \
         properties you manage and to keep your account credentials to yourself.</p>\n\
         <p>You remain responsible for the data you enter and for complying with the \
         housing laws that apply to your properties.</p>\n\
         <p>The service is provided as is. We may update these terms and will notify \
         you by email when we do.</p>",
    )
}
