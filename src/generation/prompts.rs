//! Prompt templates for site generation and refinement

/// System prompt for the initial site generation request
pub const GENERATION_SYSTEM_PROMPT: &str = r#"You are a full-stack site generator. You turn a short project description into a complete, buildable multi-file web project and reply with machine-readable file listings only."#;

const GENERATION_TEMPLATE: &str = r#"Project description:
---
{description}
---

Build a multi-file project for this description using these conventions:

1. Framework: React with TypeScript, bundled by Vite
2. Styling: TailwindCSS with one consistent theme
   - Primary #1A73E8, accent #FF6F61, background #F9FAFB
   - Font: Inter, sans-serif
3. Layout: responsive grid, cards with soft shadows and rounded corners
4. Motion: Framer Motion for subtle entry effects on buttons, cards and modals
5. Files to include at minimum:
   - `src/main.tsx`: application root
   - `src/App.tsx`: routes and shared layout
   - `src/pages/index.tsx`: landing page with hero and feature highlights
   - `src/pages/about.tsx`: about page
   - `src/components/Navbar.tsx` and `src/components/Footer.tsx`
   - `index.html`, `tailwind.config.ts`, `vite.config.ts`
   - `package.json` listing every library used by any file, with
     `@vitejs/plugin-react` and `tailwindcss` as dev dependencies and a
     `build` script that writes the production bundle to `dist/`

Reply with a JSON array of files in exactly this shape:

[
  {"filename": "src/App.tsx", "type": "tsx", "content": "..."},
  {"filename": "package.json", "type": "json", "content": "..."}
]

Reply with code only. The reply is parsed and written to disk as project files."#;

/// System prompt for change requests against an existing project
pub const REFINEMENT_SYSTEM_PROMPT: &str = r#"You are a code assistant updating an existing project. Reply only with a JSON object whose "files" array holds the new or modified files."#;

const REFINEMENT_TEMPLATE: &str = r#"Change request:
---
{request}
---

Most relevant existing files:
---
{context}
---

Reply with a JSON object in exactly this shape:

{"files": [
  {"filename": "src/components/Hero.tsx", "type": "tsx", "content": "..."}
]}

Include only files that are new or changed, each at most once. If nothing needs to change, reply with {"files": []}."#;

/// Embeds the user's project description into the generation template.
pub fn generation_prompt(description: &str) -> String {
    GENERATION_TEMPLATE.replace("{description}", description.trim())
}

/// Embeds a change request and the relevant file excerpt into the refinement template.
pub fn refinement_prompt(request: &str, context: &str) -> String {
    // Context first so a request containing "{context}" is not expanded.
    REFINEMENT_TEMPLATE
        .replace("{context}", context.trim())
        .replacen("{request}", request.trim(), 1)
}
